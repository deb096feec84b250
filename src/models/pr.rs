// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Personal-record history embedded in each exercise document.
//!
//! Promotion and rollback are pure transitions on [`PrHistory`]; the
//! ledger service decides when to run them and persists the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::WorkoutSet;

/// Snapshot of a set at the moment it became the exercise's PR.
///
/// The score is frozen at promotion time and is not recomputed if the
/// underlying set changes later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PrRecord {
    /// Set that achieved the record
    pub set_id: String,
    pub reps: u32,
    pub weight: f64,
    /// reps × weight
    pub score: f64,
    /// Session the set was logged in
    pub session: String,
    /// When the promotion happened (orders history during rollback)
    #[serde(with = "crate::time_utils::rfc3339")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub timestamp: DateTime<Utc>,
}

impl PrRecord {
    /// Build a record from a persisted set.
    pub fn from_set(set: &WorkoutSet, timestamp: DateTime<Utc>) -> Self {
        Self {
            set_id: set.id.clone(),
            reps: set.rep_count,
            weight: set.weight,
            score: set.score,
            session: set.session.clone(),
            timestamp,
        }
    }
}

/// Current PR plus the records it superseded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PrHistory {
    #[serde(default)]
    pub current_pr: Option<PrRecord>,
    /// Superseded records, in no particular order
    #[serde(default)]
    pub past_prs: Vec<PrRecord>,
}

impl PrHistory {
    /// Whether a set with `score` would become the new PR.
    ///
    /// Ties never promote.
    pub fn qualifies(&self, score: f64) -> bool {
        match &self.current_pr {
            None => true,
            Some(current) => score > current.score,
        }
    }

    /// Promote `record` if it beats the current PR.
    ///
    /// Returns `true` if the history changed.
    pub fn promote(&mut self, record: PrRecord) -> bool {
        if !self.qualifies(record.score) {
            return false;
        }

        if let Some(previous) = self.current_pr.replace(record) {
            self.archive(previous);
        }
        true
    }

    /// Restore the most recently promoted past record as current.
    ///
    /// With no history the current PR is cleared. Records sharing a
    /// timestamp keep their stored relative order.
    pub fn rollback(&mut self) -> Option<&PrRecord> {
        let mut past = std::mem::take(&mut self.past_prs);
        past.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        self.current_pr = if past.is_empty() {
            None
        } else {
            Some(past.remove(0))
        };
        self.past_prs = past;

        self.current_pr.as_ref()
    }

    /// Append to history with set semantics (an identical record is only kept once).
    fn archive(&mut self, record: PrRecord) {
        if !self.past_prs.contains(&record) {
            self.past_prs.push(record);
        }
    }
}
