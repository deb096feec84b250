// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Set logging service.
//!
//! Every write path that changes a set's reps, weight or exercise goes
//! through here so PR state stays consistent:
//! 1. Log: create the set, attach it to its session, check for a PR
//! 2. Edit: roll back if the set held the PR, persist, recheck
//! 3. Delete: remove the set, detach it, roll back if it held the PR
//!
//! Planned sets created from a routine skip the PR check; they are
//! checked when edited into performed sets.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::config::WINDOW_DAYS;
use crate::db::{collections, Direction, DocumentStore, FieldUpdate, Query, Subscription};
use crate::error::{AppError, Result};
use crate::models::{PrHistory, Routine, SetDraft, WorkoutSet};
use crate::services::ledger::{PrLedger, PromotionOutcome};
use crate::services::{decode_all, ExerciseService, SessionService};
use crate::time_utils::{format_utc_rfc3339, now_millis};

/// A set as persisted by a log or edit, plus what the PR check did.
#[derive(Debug, Clone)]
pub struct LoggedSet {
    pub set: WorkoutSet,
    pub promotion: PromotionOutcome,
}

pub struct SetService<S> {
    store: Arc<S>,
    ledger: PrLedger<S>,
    exercises: ExerciseService<S>,
    sessions: SessionService<S>,
    window_days: i64,
    recent_limit: u32,
}

impl<S> Clone for SetService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ledger: self.ledger.clone(),
            exercises: self.exercises.clone(),
            sessions: self.sessions.clone(),
            window_days: self.window_days,
            recent_limit: self.recent_limit,
        }
    }
}

/// A user's sets created within `days` days before `end` (inclusive).
///
/// `days` is clamped to [`WINDOW_DAYS`].
pub(crate) fn window_query(user: &str, end: DateTime<Utc>, days: i64) -> Query {
    let days = days.clamp(*WINDOW_DAYS.start(), *WINDOW_DAYS.end());
    let start = end
        .checked_sub_signed(Duration::days(days))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    Query::new(collections::SETS)
        .where_eq("createdBy", user)
        .where_gte("createdAt", format_utc_rfc3339(start))
        .where_lte("createdAt", format_utc_rfc3339(end))
        .order_by("createdAt", Direction::Ascending)
}

impl<S: DocumentStore> SetService<S> {
    pub fn new(
        store: Arc<S>,
        ledger: PrLedger<S>,
        exercises: ExerciseService<S>,
        sessions: SessionService<S>,
        window_days: i64,
        recent_limit: u32,
    ) -> Self {
        Self {
            store,
            ledger,
            exercises,
            sessions,
            window_days,
            recent_limit,
        }
    }

    /// Log a new set in a session and promote it if it is a PR.
    pub async fn log_set(&self, user: &str, session_id: &str, draft: &SetDraft) -> Result<LoggedSet> {
        draft.validate()?;

        let exercise = self.exercises.get_exercise(&draft.exercise).await?;
        // Fail before writing anything if the session is gone
        self.sessions.get_session(session_id).await?;

        let mut set = draft.to_set(&exercise.name, session_id, user, now_millis());
        set.id = self
            .store
            .create_document(collections::SETS, serde_json::to_value(&set)?)
            .await?;

        tracing::info!(
            user,
            session_id,
            set_id = %set.id,
            exercise_id = %exercise.id,
            reps = set.rep_count,
            weight = set.weight,
            complete = set.complete,
            "Set logged"
        );

        self.sessions.attach_set(session_id, &set.id).await?;

        let promotion = self.ledger.check_and_promote(&exercise, &set).await?;
        set.is_pr = promotion.is_promoted();

        Ok(LoggedSet { set, promotion })
    }

    /// Add one planned (incomplete) set per routine exercise to a session.
    ///
    /// Every exercise is resolved before anything is written.
    pub async fn plan_routine(
        &self,
        user: &str,
        session_id: &str,
        routine: &Routine,
    ) -> Result<Vec<WorkoutSet>> {
        self.sessions.get_session(session_id).await?;

        let mut exercises = Vec::with_capacity(routine.exercises.len());
        for exercise_id in &routine.exercises {
            exercises.push(self.exercises.get_exercise(exercise_id).await?);
        }

        let now = now_millis();
        let mut planned = Vec::with_capacity(exercises.len());
        for exercise in &exercises {
            let mut set = SetDraft::new(&exercise.id, 0, 0.0)
                .planned()
                .to_set(&exercise.name, session_id, user, now);
            set.id = self
                .store
                .create_document(collections::SETS, serde_json::to_value(&set)?)
                .await?;
            self.sessions.attach_set(session_id, &set.id).await?;
            planned.push(set);
        }

        tracing::info!(
            user,
            session_id,
            routine_id = %routine.id,
            sets = planned.len(),
            "Routine planned"
        );

        Ok(planned)
    }

    /// Edit a set's values (and possibly its exercise), keeping PR state consistent.
    pub async fn edit_set(&self, set_id: &str, draft: &SetDraft) -> Result<LoggedSet> {
        draft.validate()?;

        let original = self.get_set(set_id).await?;
        // Resolve the target exercise before touching anything
        let target = self.exercises.get_exercise(&draft.exercise).await?;

        if original.is_pr {
            self.rollback_tolerating_missing(&original.exercise).await?;
        }

        let now = now_millis();
        let update = FieldUpdate::new()
            .set("exercise", json!(draft.exercise))
            .set("exerciseName", json!(target.name))
            .set("repCount", json!(draft.rep_count()))
            .set("weight", json!(draft.weight()))
            .set("intensity", json!(draft.intensity()))
            .set("notes", json!(draft.notes))
            .set("score", json!(draft.score()))
            .set("complete", json!(draft.complete))
            .set("isPr", json!(false))
            .set("updatedAt", json!(format_utc_rfc3339(now)));

        self.store
            .update_document(collections::SETS, set_id, update)
            .await?;

        tracing::info!(
            set_id,
            from_exercise = %original.exercise,
            to_exercise = %target.id,
            score = draft.score(),
            "Set edited"
        );

        let mut set = draft.to_set(&target.name, &original.session, &original.created_by, now);
        set.id = original.id;
        set.created_at = original.created_at;

        // Rollback may have rewritten the target's PR state
        let target = if original.is_pr && original.exercise == target.id {
            self.exercises.get_exercise(&target.id).await?
        } else {
            target
        };

        let promotion = self.ledger.check_and_promote(&target, &set).await?;
        set.is_pr = promotion.is_promoted();

        Ok(LoggedSet { set, promotion })
    }

    /// Delete a set. Returns the exercise's PR history if the set held the PR.
    pub async fn delete_set(&self, set_id: &str) -> Result<Option<PrHistory>> {
        let set = self.get_set(set_id).await?;

        self.store
            .delete_document(collections::SETS, set_id)
            .await?;

        match self.sessions.detach_set(&set.session, set_id).await {
            Ok(()) => {}
            Err(AppError::NotFound(_)) => {
                tracing::warn!(set_id, session_id = %set.session, "Session missing for deleted set");
            }
            Err(e) => return Err(e),
        }

        tracing::info!(set_id, exercise_id = %set.exercise, was_pr = set.is_pr, "Set deleted");

        if set.is_pr {
            let history = self.ledger.rollback(&set.exercise).await?;
            return Ok(Some(history));
        }
        Ok(None)
    }

    pub async fn get_set(&self, id: &str) -> Result<WorkoutSet> {
        self.store
            .get_document(collections::SETS, id)
            .await?
            .ok_or_else(|| AppError::not_found(collections::SETS, id))?
            .decode()
    }

    /// The user's most recent completed sets of an exercise, newest first.
    pub async fn recent_completed_sets(
        &self,
        user: &str,
        exercise_id: &str,
    ) -> Result<Vec<WorkoutSet>> {
        let query = Query::new(collections::SETS)
            .where_eq("createdBy", user)
            .where_eq("exercise", exercise_id)
            .where_eq("complete", true)
            .order_by("createdAt", Direction::Descending)
            .limit(self.recent_limit);

        let snapshots = self.store.query(&query).await?;
        decode_all(&snapshots)
    }

    /// The user's sets created in the trailing window ending at `end`, oldest first.
    pub async fn sets_in_window(&self, user: &str, end: DateTime<Utc>) -> Result<Vec<WorkoutSet>> {
        let snapshots = self
            .store
            .query(&window_query(user, end, self.window_days))
            .await?;
        decode_all(&snapshots)
    }

    /// Sets of one session, in the order they were logged.
    pub async fn session_sets(&self, session_id: &str) -> Result<Vec<WorkoutSet>> {
        let snapshots = self.store.query(&session_sets_query(session_id)).await?;
        decode_all(&snapshots)
    }

    /// Watch the sets of one session.
    pub fn subscribe_session_sets(&self, session_id: &str) -> Result<Subscription> {
        let subscription = self.store.subscribe(session_sets_query(session_id))?;
        tracing::debug!(session_id, "Subscribed to session sets");
        Ok(subscription)
    }

    /// Roll back an exercise's PR; a deleted exercise has no PR to fix.
    async fn rollback_tolerating_missing(&self, exercise_id: &str) -> Result<()> {
        match self.ledger.rollback(exercise_id).await {
            Ok(_) => Ok(()),
            Err(AppError::NotFound(_)) => {
                tracing::warn!(exercise_id, "Exercise missing during PR rollback");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn session_sets_query(session_id: &str) -> Query {
    Query::new(collections::SETS)
        .where_eq("session", session_id)
        .order_by("createdAt", Direction::Ascending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FilterOp;
    use chrono::TimeZone;

    fn lower_bound(query: &Query) -> &str {
        query
            .filters
            .iter()
            .find(|f| f.op == FilterOp::GreaterThanOrEqual)
            .and_then(|f| f.value.as_str())
            .unwrap()
    }

    #[test]
    fn test_window_query_bounds() {
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let query = window_query("u1", end, 7);
        assert_eq!(lower_bound(&query), "2024-01-08T12:00:00.000Z");
    }

    #[test]
    fn test_window_query_clamps_days() {
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

        // Negative windows would invert the range
        let query = window_query("u1", end, -7);
        assert_eq!(lower_bound(&query), "2024-01-14T12:00:00.000Z");

        let query = window_query("u1", end, i64::MAX);
        assert_eq!(lower_bound(&query), "2023-01-14T12:00:00.000Z");
    }
}
