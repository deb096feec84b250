// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Personal-record ledger.
//!
//! Owns every write to `Exercise.pr` and to `WorkoutSet.isPr`:
//! 1. Promotion when a set beats the current PR (strictly); the set it
//!    supersedes loses its `isPr` flag in the same batch
//! 2. Rollback to the most recent past PR when the record set goes away
//!
//! Exercise writes are compare-and-set against the revision the caller
//! read, so a promotion computed from stale PR state is rejected with
//! `AppError::Conflict` instead of silently overwriting a concurrent one.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::db::{collections, DocumentStore, DocumentWrite, FieldUpdate, Precondition};
use crate::error::{AppError, Result};
use crate::models::{Exercise, PrHistory, PrRecord, WorkoutSet};
use crate::time_utils::now_millis;

/// Result of [`PrLedger::check_and_promote`].
#[derive(Debug, Clone, PartialEq)]
pub enum PromotionOutcome {
    /// The set became the new PR; `history` is what was persisted.
    Promoted { history: PrHistory },
    /// The set did not beat the current PR. Nothing was written.
    Unchanged,
}

impl PromotionOutcome {
    pub fn is_promoted(&self) -> bool {
        matches!(self, PromotionOutcome::Promoted { .. })
    }
}

pub struct PrLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for PrLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: DocumentStore> PrLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Promote `set` to be the PR of `exercise` if its score is strictly higher.
    ///
    /// The exercise update and both `isPr` flag writes (set on `set`,
    /// cleared on the set it supersedes) are committed in one atomic batch.
    /// The exercise write requires the document to still be at
    /// `exercise.revision`; an exercise built without a revision only
    /// requires the document to exist.
    pub async fn check_and_promote(
        &self,
        exercise: &Exercise,
        set: &WorkoutSet,
    ) -> Result<PromotionOutcome> {
        let mut history = exercise.pr.clone();
        if !history.promote(PrRecord::from_set(set, now_millis())) {
            tracing::debug!(
                exercise_id = %exercise.id,
                set_id = %set.id,
                score = set.score,
                "Set does not beat current PR"
            );
            return Ok(PromotionOutcome::Unchanged);
        }

        let precondition = exercise
            .revision
            .map(Precondition::Revision)
            .unwrap_or_default();

        let mut writes = vec![
            DocumentWrite::update(
                collections::EXERCISES,
                &exercise.id,
                pr_update(&history)?.with_precondition(precondition),
            ),
            DocumentWrite::update(
                collections::SETS,
                &set.id,
                FieldUpdate::new().set("isPr", json!(true)),
            ),
        ];
        if let Some(clear) = self.clear_superseded_flag(exercise, set).await? {
            writes.push(clear);
        }

        self.store.commit(writes).await.map_err(|e| {
            tracing::warn!(
                exercise_id = %exercise.id,
                set_id = %set.id,
                error = %e,
                "PR promotion failed"
            );
            e
        })?;

        tracing::info!(
            exercise_id = %exercise.id,
            set_id = %set.id,
            score = set.score,
            past_prs = history.past_prs.len(),
            "PR promoted"
        );

        Ok(PromotionOutcome::Promoted { history })
    }

    /// Restore the most recently promoted past PR of an exercise.
    ///
    /// With no past PRs the current PR is cleared. The `isPr` flag of the
    /// restored record's set is left as it is.
    pub async fn rollback(&self, exercise_id: &str) -> Result<PrHistory> {
        let snapshot = self
            .store
            .get_document(collections::EXERCISES, exercise_id)
            .await?
            .ok_or_else(|| AppError::not_found(collections::EXERCISES, exercise_id))?;

        let mut history: PrHistory = match snapshot.fields.get("pr") {
            Some(pr) if !pr.is_null() => serde_json::from_value(pr.clone())?,
            _ => PrHistory::default(),
        };

        let restored = history.rollback().map(|record| record.set_id.clone());

        self.store
            .update_document(
                collections::EXERCISES,
                exercise_id,
                pr_update(&history)?.with_precondition(Precondition::Revision(snapshot.revision)),
            )
            .await?;

        tracing::info!(
            exercise_id,
            restored_set = restored.as_deref().unwrap_or("none"),
            past_prs = history.past_prs.len(),
            "PR rolled back"
        );

        Ok(history)
    }

    /// Write that drops `isPr` from the set holding the PR `set` replaces.
    ///
    /// A superseded set that was already deleted needs no write.
    async fn clear_superseded_flag(
        &self,
        exercise: &Exercise,
        set: &WorkoutSet,
    ) -> Result<Option<DocumentWrite>> {
        let Some(previous) = exercise.pr.current_pr.as_ref() else {
            return Ok(None);
        };
        if previous.set_id.is_empty() || previous.set_id == set.id {
            return Ok(None);
        }

        if self
            .store
            .get_document(collections::SETS, &previous.set_id)
            .await?
            .is_none()
        {
            tracing::debug!(
                exercise_id = %exercise.id,
                set_id = %previous.set_id,
                "Superseded PR set no longer exists"
            );
            return Ok(None);
        }

        Ok(Some(DocumentWrite::update(
            collections::SETS,
            &previous.set_id,
            FieldUpdate::new().set("isPr", json!(false)),
        )))
    }
}

/// Update of both PR fields, leaving the rest of the exercise alone.
fn pr_update(history: &PrHistory) -> Result<FieldUpdate> {
    let current: Value = serde_json::to_value(&history.current_pr)?;
    let past: Value = serde_json::to_value(&history.past_prs)?;
    Ok(FieldUpdate::new()
        .set("pr.currentPr", current)
        .set("pr.pastPrs", past))
}
