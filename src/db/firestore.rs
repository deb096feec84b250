// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed document store.
//!
//! Document revisions are the server `update_time`, and compare-and-set
//! writes use an `UpdateTime` precondition. Batches run in a transaction.

use async_trait::async_trait;
use gcloud_sdk::google::firestore::v1::listen_response::ResponseType;
use gcloud_sdk::google::firestore::v1::target_change::TargetChangeType;
use gcloud_sdk::google::firestore::v1::Document;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};

use crate::db::query::{Direction, Filter, FilterOp, Query};
use crate::db::store::{DocumentStore, DocumentWrite, Precondition, Revision, Snapshot};
use crate::db::subscription::Subscription;
use crate::error::{AppError, Result};

const LISTEN_TARGET: u32 = 17;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a store with no connection (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Writes ──────────────────────────────────────────────────

    fn add_write(
        client: &firestore::FirestoreDb,
        transaction: &mut firestore::FirestoreTransaction<'_>,
        write: &DocumentWrite,
    ) -> Result<()> {
        match write {
            DocumentWrite::Update {
                collection,
                id,
                update,
            } => {
                let precondition = match update.precondition() {
                    Precondition::MustExist => firestore::FirestoreWritePrecondition::Exists(true),
                    Precondition::Revision(revision) => {
                        firestore::FirestoreWritePrecondition::UpdateTime(revision_to_time(
                            revision,
                        )?)
                    }
                };

                client
                    .fluent()
                    .update()
                    .fields(update.paths())
                    .in_col(collection)
                    .precondition(precondition)
                    .document_id(id)
                    .object(&update.to_nested())
                    .add_to_transaction(transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add update of {}/{} to transaction: {}",
                            collection, id, e
                        ))
                    })?;
            }
            DocumentWrite::Delete { collection, id } => {
                client
                    .fluent()
                    .delete()
                    .from(collection.as_str())
                    .document_id(id)
                    .add_to_transaction(transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion of {}/{} to transaction: {}",
                            collection, id, e
                        ))
                    })?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Snapshot>> {
        let doc: Option<Document> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .one(id)
            .await
            .map_err(classify_error)?;

        doc.as_ref().map(to_snapshot).transpose()
    }

    async fn create_document(&self, collection: &str, fields: Value) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(&id)
            .object(&fields)
            .execute()
            .await
            .map_err(classify_error)?;

        tracing::debug!(collection, id = %id, "Document created");
        Ok(id)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(classify_error)?;
        Ok(())
    }

    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for write in &writes {
            Self::add_write(client, &mut transaction, write)?;
        }

        transaction.commit().await.map_err(classify_error)?;

        tracing::debug!(writes = writes.len(), "Transaction committed");
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Snapshot>> {
        let filters = query.filters.clone();

        let mut select = self
            .get_client()?
            .fluent()
            .select()
            .from(query.collection.as_str())
            .filter(move |q| firestore_filter(q, &filters));

        if let Some((field, direction)) = &query.order_by {
            select = select.order_by([(field.as_str(), firestore_direction(*direction))]);
        }
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        let docs: Vec<Document> = select.query().await.map_err(classify_error)?;
        let snapshots = docs.iter().map(to_snapshot).collect::<Result<Vec<_>>>()?;

        // Normalize ordering so both backends agree on ties
        Ok(query.apply(snapshots))
    }

    fn subscribe(&self, query: Query) -> Result<Subscription> {
        let client = self.get_client()?.clone();
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("no async runtime: {e}")))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        runtime.spawn(async move {
            if let Err(e) = run_listener(client, query, sender, stop_rx).await {
                tracing::error!(error = %e, "Firestore listener failed");
            }
        });

        Ok(Subscription::new(receiver, move || {
            let _ = stop_tx.send(());
        }))
    }
}

#[derive(Default)]
struct ListenState {
    docs: BTreeMap<String, Snapshot>,
    dirty: bool,
    delivered: bool,
}

/// Watch a collection and deliver the query result after each consistent snapshot.
async fn run_listener(
    client: firestore::FirestoreDb,
    query: Query,
    sender: mpsc::UnboundedSender<Vec<Snapshot>>,
    stop: oneshot::Receiver<()>,
) -> Result<()> {
    let mut listener = client
        .create_listener(firestore::FirestoreMemListenStateStorage::new())
        .await
        .map_err(|e| AppError::Database(format!("Failed to create listener: {}", e)))?;

    let filters = query.filters.clone();
    client
        .fluent()
        .select()
        .from(query.collection.as_str())
        .filter(move |q| firestore_filter(q, &filters))
        .listen()
        .add_target(firestore::FirestoreListenerTarget::new(LISTEN_TARGET), &mut listener)
        .map_err(|e| AppError::Database(format!("Failed to add listen target: {}", e)))?;

    let state = Arc::new(Mutex::new(ListenState::default()));
    let query = Arc::new(query);

    listener
        .start(move |event| {
            let state = state.clone();
            let query = query.clone();
            let sender = sender.clone();
            async move {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                apply_listen_event(&mut state, &query, event, &sender);
                Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
            }
        })
        .await
        .map_err(|e| AppError::Database(format!("Failed to start listener: {}", e)))?;

    tracing::debug!("Firestore listener started");

    // Either an explicit cancel or a dropped handle ends the listener
    let _ = stop.await;

    listener
        .shutdown()
        .await
        .map_err(|e| AppError::Database(format!("Failed to stop listener: {}", e)))?;

    tracing::debug!("Firestore listener stopped");
    Ok(())
}

fn apply_listen_event(
    state: &mut ListenState,
    query: &Query,
    event: firestore::FirestoreListenEvent,
    sender: &mpsc::UnboundedSender<Vec<Snapshot>>,
) {
    match event {
        ResponseType::DocumentChange(change) => {
            let Some(doc) = change.document else {
                return;
            };
            match to_snapshot(&doc) {
                Ok(snapshot) if query.matches(&snapshot.fields) => {
                    state.docs.insert(snapshot.id.clone(), snapshot);
                }
                Ok(snapshot) => {
                    state.docs.remove(&snapshot.id);
                }
                Err(e) => {
                    tracing::warn!(error = %e, document = %doc.name, "Skipping undecodable document");
                    return;
                }
            }
            state.dirty = true;
        }
        ResponseType::DocumentDelete(delete) => {
            state.docs.remove(document_id(&delete.document));
            state.dirty = true;
        }
        ResponseType::DocumentRemove(remove) => {
            state.docs.remove(document_id(&remove.document));
            state.dirty = true;
        }
        ResponseType::TargetChange(change) => {
            // A global NO_CHANGE marks a consistent snapshot across targets
            let consistent = change.target_change_type == TargetChangeType::NoChange as i32
                && change.target_ids.is_empty();
            if consistent && (state.dirty || !state.delivered) {
                let _ = sender.send(query.apply(state.docs.values().cloned()));
                state.dirty = false;
                state.delivered = true;
            }
        }
        ResponseType::Filter(_) => {}
    }
}

// ─── Conversions ─────────────────────────────────────────────────

fn firestore_filter(
    q: firestore::select_filter_builder::FirestoreQueryFilterBuilder,
    filters: &[Filter],
) -> Option<firestore::FirestoreQueryFilter> {
    q.for_all(filters.iter().map(|filter| {
        let field = q.field(filter.field.as_str());
        let value = filter.value.clone();
        match filter.op {
            FilterOp::Eq => field.eq(value),
            FilterOp::GreaterThanOrEqual => field.greater_than_or_equal(value),
            FilterOp::LessThanOrEqual => field.less_than_or_equal(value),
        }
    }))
}

fn firestore_direction(direction: Direction) -> firestore::FirestoreQueryDirection {
    match direction {
        Direction::Ascending => firestore::FirestoreQueryDirection::Ascending,
        Direction::Descending => firestore::FirestoreQueryDirection::Descending,
    }
}

fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn to_snapshot(doc: &Document) -> Result<Snapshot> {
    let revision = doc
        .update_time
        .as_ref()
        .map(|t| Revision(t.seconds.max(0) as u64 * 1_000_000_000 + t.nanos.max(0) as u64))
        .unwrap_or_default();

    let mut fields: Value = firestore::FirestoreDb::deserialize_doc_to(doc)
        .map_err(|e| AppError::Serialization(format!("{}: {}", doc.name, e)))?;

    // Drop the metadata fields the deserializer injects
    if let Value::Object(map) = &mut fields {
        map.retain(|key, _| !key.starts_with("_firestore"));
    }

    Ok(Snapshot {
        id: document_id(&doc.name).to_string(),
        revision,
        fields,
    })
}

fn revision_to_time(revision: Revision) -> Result<chrono::DateTime<chrono::Utc>> {
    let secs = (revision.0 / 1_000_000_000) as i64;
    let nanos = (revision.0 % 1_000_000_000) as u32;
    chrono::DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| AppError::InvalidInput(format!("revision {} is out of range", revision.0)))
}

fn classify_error(e: firestore::errors::FirestoreError) -> AppError {
    let message = e.to_string();
    match e {
        firestore::errors::FirestoreError::DataNotFoundError(_) => AppError::NotFound(message),
        firestore::errors::FirestoreError::DataConflictError(_) => AppError::Conflict(message),
        _ if message.contains("FAILED_PRECONDITION") || message.contains("FailedPrecondition") => {
            AppError::Conflict(message)
        }
        _ => AppError::Database(message),
    }
}
