// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise catalog service.

use serde_json::json;
use std::sync::Arc;

use crate::db::{collections, Direction, DocumentStore, FieldUpdate, Query, Subscription};
use crate::error::{AppError, Result};
use crate::models::{Exercise, ExerciseDraft, PrHistory};
use crate::services::decode_all;
use crate::time_utils::now_millis;

/// Create, edit and look up a user's exercises.
///
/// PR state is never written here; see [`crate::services::PrLedger`].
pub struct ExerciseService<S> {
    store: Arc<S>,
}

impl<S> Clone for ExerciseService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

/// All exercises owned by `user`, by name.
pub(crate) fn catalog_query(user: &str) -> Query {
    Query::new(collections::EXERCISES)
        .where_eq("user", user)
        .order_by("name", Direction::Ascending)
}

impl<S: DocumentStore> ExerciseService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create an exercise with an empty PR history.
    pub async fn create_exercise(&self, user: &str, draft: &ExerciseDraft) -> Result<Exercise> {
        let muscle_groups = draft.muscle_groups()?;

        let exercise = Exercise {
            id: String::new(),
            revision: None,
            user: user.to_string(),
            name: draft.name.trim().to_string(),
            variation: draft.variation.clone(),
            rep_range: draft.rep_range.clone(),
            categories: draft.categories.clone(),
            muscle_groups,
            pr: PrHistory::default(),
            created_date: now_millis(),
        };

        let id = self
            .store
            .create_document(collections::EXERCISES, serde_json::to_value(&exercise)?)
            .await?;

        tracing::info!(user, exercise_id = %id, name = %exercise.name, "Exercise created");

        self.get_exercise(&id).await
    }

    /// Replace the descriptive fields and muscle groups of an exercise.
    pub async fn update_exercise(&self, id: &str, draft: &ExerciseDraft) -> Result<Exercise> {
        let muscle_groups = draft.muscle_groups()?;

        let update = FieldUpdate::new()
            .set("name", json!(draft.name.trim()))
            .set("variation", json!(draft.variation))
            .set("repRange", json!(draft.rep_range))
            .set("categories", serde_json::to_value(&draft.categories)?)
            .set("muscleGroups", serde_json::to_value(&muscle_groups)?);

        self.store
            .update_document(collections::EXERCISES, id, update)
            .await?;

        tracing::info!(exercise_id = id, "Exercise updated");

        self.get_exercise(id).await
    }

    pub async fn delete_exercise(&self, id: &str) -> Result<()> {
        self.store
            .delete_document(collections::EXERCISES, id)
            .await?;
        tracing::info!(exercise_id = id, "Exercise deleted");
        Ok(())
    }

    pub async fn get_exercise(&self, id: &str) -> Result<Exercise> {
        self.store
            .get_document(collections::EXERCISES, id)
            .await?
            .ok_or_else(|| AppError::not_found(collections::EXERCISES, id))?
            .decode()
    }

    /// The user's full catalog, ordered by name.
    pub async fn list_exercises(&self, user: &str) -> Result<Vec<Exercise>> {
        let snapshots = self.store.query(&catalog_query(user)).await?;
        decode_all(&snapshots)
    }

    /// Watch the user's catalog.
    pub fn subscribe_exercises(&self, user: &str) -> Result<Subscription> {
        let subscription = self.store.subscribe(catalog_query(user))?;
        tracing::debug!(user, "Subscribed to exercise catalog");
        Ok(subscription)
    }
}
