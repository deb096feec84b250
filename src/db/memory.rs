// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Behaves like the Firestore backend for everything the services rely on:
//! revisions, preconditions, atomic batches and live queries. Used by the
//! test suite and for running without an emulator.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tokio::sync::mpsc;

use crate::db::query::Query;
use crate::db::store::{DocumentStore, DocumentWrite, Precondition, Revision, Snapshot};
use crate::db::subscription::Subscription;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
struct StoredDoc {
    revision: Revision,
    fields: Value,
}

struct Subscriber {
    query: Query,
    sender: mpsc::UnboundedSender<Vec<Snapshot>>,
}

type Collections = HashMap<String, BTreeMap<String, StoredDoc>>;

#[derive(Default)]
struct Inner {
    collections: RwLock<Collections>,
    next_revision: AtomicU64,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    subscribers: DashMap<u64, Subscriber>,
    next_subscriber: AtomicU64,
    /// Serializes deliveries so subscribers never see an older result after a newer one
    notifying: Mutex<()>,
}

/// Thread-safe in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents written (created, updated or deleted) so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Insert or replace a document with a caller-chosen ID.
    pub fn put_document(&self, collection: &str, id: &str, fields: Value) -> Result<Revision> {
        self.check_writable()?;
        let revision = self.bump_revision();
        {
            let mut collections = self.write_collections();
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), StoredDoc { revision, fields });
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.notify([collection.to_string()].into_iter().collect());
        Ok(revision)
    }

    fn check_writable(&self) -> Result<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(
                "memory store: writes are disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn bump_revision(&self) -> Revision {
        Revision(self.inner.next_revision.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn read_collections(&self) -> std::sync::RwLockReadGuard<'_, Collections> {
        self.inner
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_collections(&self) -> std::sync::RwLockWriteGuard<'_, Collections> {
        self.inner
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn collection_snapshots(collections: &Collections, collection: &str) -> Vec<Snapshot> {
        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| Snapshot {
                        id: id.clone(),
                        revision: doc.revision,
                        fields: doc.fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn run_query(&self, query: &Query) -> Vec<Snapshot> {
        let collections = self.read_collections();
        query.apply(Self::collection_snapshots(&collections, &query.collection))
    }

    /// Push fresh result sets to subscribers watching any touched collection.
    ///
    /// No subscriber map guard is held while the collections lock is taken;
    /// `subscribe` takes them in the opposite order.
    fn notify(&self, touched: HashSet<String>) {
        let _serialized = self
            .inner
            .notifying
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let watching: Vec<(u64, Query, mpsc::UnboundedSender<Vec<Snapshot>>)> = self
            .inner
            .subscribers
            .iter()
            .filter(|entry| touched.contains(&entry.value().query.collection))
            .map(|entry| {
                let subscriber = entry.value();
                (*entry.key(), subscriber.query.clone(), subscriber.sender.clone())
            })
            .collect();

        let mut closed = Vec::new();
        {
            let collections = self.read_collections();
            for (id, query, sender) in &watching {
                let result =
                    query.apply(Self::collection_snapshots(&collections, &query.collection));
                if sender.send(result).is_err() {
                    closed.push(*id);
                }
            }
        }

        for id in closed {
            self.inner.subscribers.remove(&id);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Snapshot>> {
        let collections = self.read_collections();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| Snapshot {
                id: id.to_string(),
                revision: doc.revision,
                fields: doc.fields.clone(),
            }))
    }

    async fn create_document(&self, collection: &str, fields: Value) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.put_document(collection, &id, fields)?;
        Ok(id)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.commit(vec![DocumentWrite::delete(collection, id)])
            .await
    }

    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        self.check_writable()?;

        let touched: HashSet<String> = writes
            .iter()
            .map(|write| write.collection().to_string())
            .collect();

        {
            let mut collections = self.write_collections();

            // Validate the whole batch before applying any of it
            for write in &writes {
                let DocumentWrite::Update {
                    collection,
                    id,
                    update,
                } = write
                else {
                    continue;
                };
                let existing = collections.get(collection).and_then(|docs| docs.get(id));
                match (existing, update.precondition()) {
                    (None, _) => return Err(AppError::not_found(collection, id)),
                    (Some(doc), Precondition::Revision(expected)) if doc.revision != expected => {
                        return Err(AppError::Conflict(format!(
                            "{collection}/{id} changed since it was read"
                        )));
                    }
                    _ => {}
                }
            }

            for write in &writes {
                match write {
                    DocumentWrite::Update {
                        collection,
                        id,
                        update,
                    } => {
                        let revision = self.bump_revision();
                        if let Some(doc) = collections
                            .get_mut(collection)
                            .and_then(|docs| docs.get_mut(id))
                        {
                            update.apply_to(&mut doc.fields);
                            doc.revision = revision;
                        }
                    }
                    DocumentWrite::Delete { collection, id } => {
                        if let Some(docs) = collections.get_mut(collection) {
                            docs.remove(id);
                        }
                    }
                }
            }
        }

        self.inner.writes.fetch_add(writes.len(), Ordering::SeqCst);
        self.notify(touched);
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Snapshot>> {
        Ok(self.run_query(query))
    }

    fn subscribe(&self, query: Query) -> Result<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst);

        // Register under the read lock so no write lands between the
        // initial result set and the first notification.
        {
            let collections = self.read_collections();
            let initial =
                query.apply(Self::collection_snapshots(&collections, &query.collection));
            let _ = sender.send(initial);
            self.inner
                .subscribers
                .insert(id, Subscriber { query, sender });
        }

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(receiver, move || {
            if let Some(inner) = inner.upgrade() {
                inner.subscribers.remove(&id);
            }
        }))
    }
}
