// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Saved routine service.

use std::collections::BTreeSet;
use std::sync::Arc;
use validator::Validate;

use crate::db::{collections, Direction, DocumentStore, Query, Subscription};
use crate::error::{AppError, Result};
use crate::models::{Routine, RoutineDraft};
use crate::services::decode_all;
use crate::time_utils::now_millis;

pub struct RoutineService<S> {
    store: Arc<S>,
}

impl<S> Clone for RoutineService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

fn routines_query(user: &str) -> Query {
    Query::new(collections::ROUTINES)
        .where_eq("user", user)
        .order_by("name", Direction::Ascending)
}

impl<S: DocumentStore> RoutineService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create_routine(&self, user: &str, draft: &RoutineDraft) -> Result<Routine> {
        draft.validate()?;

        let mut routine = Routine {
            id: String::new(),
            user: user.to_string(),
            name: draft.name.trim().to_string(),
            categories: draft.categories.clone(),
            exercises: draft.exercises.clone(),
            created_date: now_millis(),
        };
        routine.id = self
            .store
            .create_document(collections::ROUTINES, serde_json::to_value(&routine)?)
            .await?;

        tracing::info!(
            user,
            routine_id = %routine.id,
            name = %routine.name,
            exercises = routine.exercises.len(),
            "Routine created"
        );

        Ok(routine)
    }

    pub async fn get_routine(&self, id: &str) -> Result<Routine> {
        self.store
            .get_document(collections::ROUTINES, id)
            .await?
            .ok_or_else(|| AppError::not_found(collections::ROUTINES, id))?
            .decode()
    }

    /// The user's routines, ordered by name.
    pub async fn list_routines(&self, user: &str) -> Result<Vec<Routine>> {
        let snapshots = self.store.query(&routines_query(user)).await?;
        decode_all(&snapshots)
    }

    /// The user's routines that fit a session tagged with `categories`.
    pub async fn routines_for_session(
        &self,
        user: &str,
        categories: &BTreeSet<String>,
    ) -> Result<Vec<Routine>> {
        let mut routines = self.list_routines(user).await?;
        routines.retain(|routine| routine.fits_session(categories));
        Ok(routines)
    }

    /// Watch the user's routines.
    pub fn subscribe_routines(&self, user: &str) -> Result<Subscription> {
        let subscription = self.store.subscribe(routines_query(user))?;
        tracing::debug!(user, "Subscribed to routines");
        Ok(subscription)
    }
}
