// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout sessions and the volume views built on them.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::db::{collections, DocumentStore, FieldUpdate, Precondition, Query, Revision};
use crate::error::{AppError, Result};
use crate::models::{
    aggregate, Exercise, MuscleGroupGranularity, Session, SessionStatus, VolumeBreakdown,
    VolumeMetric, WorkoutSet,
};
use crate::services::decode_all;
use crate::services::exercises::catalog_query;
use crate::services::sets::window_query;
use crate::time_utils::now_millis;

pub struct SessionService<S> {
    store: Arc<S>,
    default_metric: VolumeMetric,
    default_granularity: MuscleGroupGranularity,
    window_days: i64,
}

impl<S> Clone for SessionService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            default_metric: self.default_metric,
            default_granularity: self.default_granularity,
            window_days: self.window_days,
        }
    }
}

impl<S: DocumentStore> SessionService<S> {
    pub fn new(
        store: Arc<S>,
        default_metric: VolumeMetric,
        default_granularity: MuscleGroupGranularity,
        window_days: i64,
    ) -> Self {
        Self {
            store,
            default_metric,
            default_granularity,
            window_days,
        }
    }

    /// Start a new active session.
    pub async fn create_session(&self, user: &str, categories: BTreeSet<String>) -> Result<Session> {
        let session = Session {
            id: String::new(),
            revision: None,
            user: user.to_string(),
            start_date: now_millis(),
            status: SessionStatus::Active,
            sets: Vec::new(),
            categories,
        };

        let id = self
            .store
            .create_document(collections::SESSIONS, serde_json::to_value(&session)?)
            .await?;

        tracing::info!(user, session_id = %id, "Session started");

        self.get_session(&id).await
    }

    pub async fn get_session(&self, id: &str) -> Result<Session> {
        self.store
            .get_document(collections::SESSIONS, id)
            .await?
            .ok_or_else(|| AppError::not_found(collections::SESSIONS, id))?
            .decode()
    }

    /// Mark a session as completed.
    pub async fn complete_session(&self, id: &str) -> Result<Session> {
        self.store
            .update_document(
                collections::SESSIONS,
                id,
                FieldUpdate::new().set("status", serde_json::to_value(SessionStatus::Completed)?),
            )
            .await?;
        tracing::info!(session_id = id, "Session completed");
        self.get_session(id).await
    }

    /// Add a set ID to the session's list. Adding an ID twice is a no-op.
    pub async fn attach_set(&self, session_id: &str, set_id: &str) -> Result<()> {
        let session = self.get_session(session_id).await?;
        if session.sets.iter().any(|id| id == set_id) {
            return Ok(());
        }

        let mut sets = session.sets;
        sets.push(set_id.to_string());
        self.write_set_list(session_id, session.revision, sets).await
    }

    /// Remove a set ID from the session's list.
    pub async fn detach_set(&self, session_id: &str, set_id: &str) -> Result<()> {
        let session = self.get_session(session_id).await?;
        if !session.sets.iter().any(|id| id == set_id) {
            return Ok(());
        }

        let sets: Vec<String> = session
            .sets
            .into_iter()
            .filter(|id| id != set_id)
            .collect();
        self.write_set_list(session_id, session.revision, sets).await
    }

    async fn write_set_list(
        &self,
        session_id: &str,
        revision: Option<Revision>,
        sets: Vec<String>,
    ) -> Result<()> {
        let precondition = revision.map(Precondition::Revision).unwrap_or_default();
        self.store
            .update_document(
                collections::SESSIONS,
                session_id,
                FieldUpdate::new()
                    .set("sets", json!(sets))
                    .with_precondition(precondition),
            )
            .await
    }

    // ─── Volume ──────────────────────────────────────────────────

    /// Volume breakdown of every set logged in a session.
    ///
    /// `None` for the metric or granularity selects the configured default.
    pub async fn session_volume(
        &self,
        session_id: &str,
        metric: Option<VolumeMetric>,
        granularity: Option<MuscleGroupGranularity>,
    ) -> Result<VolumeBreakdown> {
        let session = self.get_session(session_id).await?;
        let sets = self
            .load_sets(&Query::new(collections::SETS).where_eq("session", session_id))
            .await?;

        self.breakdown(&session.user, &sets, metric, granularity)
            .await
    }

    /// Volume breakdown of a user's sets in the trailing window ending at `end`.
    pub async fn weekly_volume(
        &self,
        user: &str,
        end: DateTime<Utc>,
        metric: Option<VolumeMetric>,
        granularity: Option<MuscleGroupGranularity>,
    ) -> Result<VolumeBreakdown> {
        let sets = self
            .load_sets(&window_query(user, end, self.window_days))
            .await?;

        self.breakdown(user, &sets, metric, granularity).await
    }

    async fn load_sets(&self, query: &Query) -> Result<Vec<WorkoutSet>> {
        let snapshots = self.store.query(query).await?;
        decode_all(&snapshots)
    }

    async fn breakdown(
        &self,
        user: &str,
        sets: &[WorkoutSet],
        metric: Option<VolumeMetric>,
        granularity: Option<MuscleGroupGranularity>,
    ) -> Result<VolumeBreakdown> {
        let metric = metric.unwrap_or(self.default_metric);
        let granularity = granularity.unwrap_or(self.default_granularity);

        let snapshots = self.store.query(&catalog_query(user)).await?;
        let exercises: Vec<Exercise> = decode_all(&snapshots)?;

        let breakdown = aggregate(sets, &exercises, metric, granularity);

        tracing::debug!(
            user,
            sets = sets.len(),
            groups = breakdown.len(),
            %metric,
            %granularity,
            "Computed volume breakdown"
        );

        Ok(breakdown)
    }
}
