// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend-neutral document store contract.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::db::query::Query;
use crate::db::subscription::Subscription;
use crate::error::Result;

/// Opaque version of a stored document.
///
/// Changes on every write to the document; used for compare-and-set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(pub u64);

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: String,
    pub revision: Revision,
    pub fields: Value,
}

impl Snapshot {
    /// Decode into a model, attaching the document ID and revision.
    pub fn decode<T: StoredDocument>(&self) -> Result<T> {
        let mut model: T = serde_json::from_value(self.fields.clone())?;
        model.attach(self.id.clone(), self.revision);
        Ok(model)
    }
}

/// Models that live in a collection and carry their document ID.
pub trait StoredDocument: DeserializeOwned {
    fn attach(&mut self, id: String, revision: Revision);
}

/// Condition a write must satisfy to be applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Precondition {
    /// The document must exist (NotFound otherwise)
    #[default]
    MustExist,
    /// The document must still be at this revision (Conflict otherwise)
    Revision(Revision),
}

/// Partial update of a document addressed by dotted field paths.
///
/// Only the named paths change; sibling fields under the same parent are
/// left alone (`pr.currentPr` does not touch `pr.pastPrs`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    fields: Vec<(String, Value)>,
    precondition: Precondition,
}

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: &str, value: Value) -> Self {
        self.fields.retain(|(existing, _)| existing != path);
        self.fields.push((path.to_string(), value));
        self
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = precondition;
        self
    }

    pub fn precondition(&self) -> Precondition {
        self.precondition
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn paths(&self) -> Vec<&str> {
        self.fields.iter().map(|(path, _)| path.as_str()).collect()
    }

    /// Expand dotted paths into a nested object (`a.b = 1` → `{"a": {"b": 1}}`).
    pub fn to_nested(&self) -> Value {
        let mut root = Value::Object(Map::new());
        self.apply_to(&mut root);
        root
    }

    /// Write every field into `doc`, creating intermediate objects as needed.
    pub fn apply_to(&self, doc: &mut Value) {
        for (path, value) in &self.fields {
            set_path(doc, path, value.clone());
        }
    }
}

fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };

        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// One write in an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentWrite {
    Update {
        collection: String,
        id: String,
        update: FieldUpdate,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl DocumentWrite {
    pub fn update(collection: &str, id: &str, update: FieldUpdate) -> Self {
        DocumentWrite::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            update,
        }
    }

    pub fn delete(collection: &str, id: &str) -> Self {
        DocumentWrite::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            DocumentWrite::Update { collection, .. } | DocumentWrite::Delete { collection, .. } => {
                collection
            }
        }
    }
}

/// Persistent document store.
///
/// Failures surface as `AppError::Database`; nothing is retried here.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document, `None` if it does not exist.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Snapshot>>;

    /// Create a document with a generated ID and return the ID.
    async fn create_document(&self, collection: &str, fields: Value) -> Result<String>;

    /// Apply a partial update to an existing document.
    async fn update_document(&self, collection: &str, id: &str, update: FieldUpdate) -> Result<()> {
        self.commit(vec![DocumentWrite::update(collection, id, update)])
            .await
    }

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<()>;

    /// Apply all writes or none of them.
    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<()>;

    /// Run a one-shot query.
    async fn query(&self, query: &Query) -> Result<Vec<Snapshot>>;

    /// Watch a query. The first delivery is the current result set.
    fn subscribe(&self, query: Query) -> Result<Subscription>;
}
