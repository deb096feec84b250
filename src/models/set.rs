// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Logged set model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::{Revision, StoredDocument};

/// Set document stored in the `sets` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    /// Document ID
    #[serde(skip)]
    pub id: String,
    /// Exercise document ID
    pub exercise: String,
    /// Exercise name when the set was logged (not kept in sync with renames)
    #[serde(default)]
    pub exercise_name: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub rep_count: u32,
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,
    /// Perceived effort, 0-10
    #[serde(default, deserialize_with = "lenient::number")]
    pub intensity: f64,
    #[serde(default)]
    pub notes: String,
    /// rep_count × weight
    #[serde(default, deserialize_with = "lenient::number")]
    pub score: f64,
    /// `false` for planned sets not yet performed
    #[serde(default = "default_complete")]
    pub complete: bool,
    /// Set only while this set holds its exercise's current PR
    #[serde(default)]
    pub is_pr: bool,
    /// Owning session ID
    pub session: String,
    /// User who logged the set
    #[serde(default)]
    pub created_by: String,
    #[serde(with = "crate::time_utils::rfc3339")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time_utils::rfc3339")]
    pub updated_at: DateTime<Utc>,
}

fn default_complete() -> bool {
    true
}

impl WorkoutSet {
    /// Planned sets count toward goal volume instead of completed volume.
    pub fn is_goal(&self) -> bool {
        !self.complete
    }
}

impl StoredDocument for WorkoutSet {
    fn attach(&mut self, id: String, _revision: Revision) {
        self.id = id;
    }
}

/// User-supplied set fields for logging and editing.
///
/// Missing or non-numeric values count as zero.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SetDraft {
    #[validate(length(min = 1, message = "an exercise must be selected"))]
    pub exercise: String,
    pub reps: Option<f64>,
    pub weight: Option<f64>,
    #[validate(range(min = 0.0, max = 10.0, message = "intensity must be between 0 and 10"))]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_complete")]
    pub complete: bool,
}

impl SetDraft {
    /// A completed set of `reps` at `weight`.
    pub fn new(exercise: &str, reps: u32, weight: f64) -> Self {
        Self {
            exercise: exercise.to_string(),
            reps: Some(f64::from(reps)),
            weight: Some(weight),
            complete: true,
            ..Default::default()
        }
    }

    /// Mark the set as planned rather than performed.
    pub fn planned(mut self) -> Self {
        self.complete = false;
        self
    }

    /// Reps rounded to a whole count; the score is computed from this count.
    pub fn rep_count(&self) -> u32 {
        to_count(number_or_zero(self.reps))
    }

    pub fn weight(&self) -> f64 {
        number_or_zero(self.weight)
    }

    pub fn intensity(&self) -> f64 {
        number_or_zero(self.intensity)
    }

    pub fn score(&self) -> f64 {
        f64::from(self.rep_count()) * self.weight()
    }

    /// Build the set document this draft describes.
    pub fn to_set(
        &self,
        exercise_name: &str,
        session: &str,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> WorkoutSet {
        WorkoutSet {
            id: String::new(),
            exercise: self.exercise.clone(),
            exercise_name: exercise_name.to_string(),
            rep_count: self.rep_count(),
            weight: self.weight(),
            intensity: self.intensity(),
            notes: self.notes.clone(),
            score: self.score(),
            complete: self.complete,
            is_pr: false,
            session: session.to_string(),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

fn number_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn to_count(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else {
        value.round().min(f64::from(u32::MAX)) as u32
    }
}

/// Deserializers for numeric set fields written by older clients.
///
/// Null, non-numeric or non-finite values read as zero. Numeric strings
/// are parsed.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn as_number(value: &Value) -> f64 {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        super::number_or_zero(parsed)
    }

    pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(|v| as_number(&v))
    }

    pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(|v| super::to_count(as_number(&v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_numbers_default_to_zero() {
        let draft = SetDraft {
            exercise: "ex1".to_string(),
            reps: None,
            weight: Some(f64::NAN),
            ..Default::default()
        };

        assert_eq!(draft.rep_count(), 0);
        assert_eq!(draft.weight(), 0.0);
        assert_eq!(draft.intensity(), 0.0);
        assert_eq!(draft.score(), 0.0);
    }

    #[test]
    fn test_score_is_reps_times_weight() {
        let draft = SetDraft::new("ex1", 5, 20.0);
        assert_eq!(draft.score(), 100.0);

        let set = draft.to_set("Bench Press", "s1", "u1", Utc::now());
        assert_eq!(set.score, 100.0);
        assert_eq!(set.rep_count, 5);
        assert!(!set.is_pr);
        assert!(set.complete);
    }

    #[test]
    fn test_intensity_out_of_range_rejected() {
        let mut draft = SetDraft::new("ex1", 5, 20.0);
        draft.intensity = Some(11.0);
        assert!(draft.validate().is_err());

        draft.intensity = Some(7.5);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_complete_defaults_to_true_when_absent() {
        let set: WorkoutSet = serde_json::from_value(serde_json::json!({
            "exercise": "ex1",
            "session": "s1",
            "createdAt": "2024-01-15T10:00:00.000Z",
            "updatedAt": "2024-01-15T10:00:00.000Z",
        }))
        .unwrap();

        assert!(set.complete);
        assert!(!set.is_goal());
        assert_eq!(set.rep_count, 0);
    }

    #[test]
    fn test_bad_stored_numbers_read_as_zero() {
        let set: WorkoutSet = serde_json::from_value(serde_json::json!({
            "exercise": "ex1",
            "session": "s1",
            "repCount": null,
            "weight": "heavy",
            "intensity": { "rpe": 8 },
            "score": null,
            "createdAt": "2024-01-15T10:00:00.000Z",
            "updatedAt": "2024-01-15T10:00:00.000Z",
        }))
        .unwrap();

        assert_eq!(set.rep_count, 0);
        assert_eq!(set.weight, 0.0);
        assert_eq!(set.intensity, 0.0);
        assert_eq!(set.score, 0.0);
    }

    #[test]
    fn test_stored_numbers_are_coerced() {
        let set: WorkoutSet = serde_json::from_value(serde_json::json!({
            "exercise": "ex1",
            "session": "s1",
            "repCount": 7.6,
            "weight": "62.5",
            "intensity": 8,
            "score": 437.5,
            "createdAt": "2024-01-15T10:00:00.000Z",
            "updatedAt": "2024-01-15T10:00:00.000Z",
        }))
        .unwrap();
        assert_eq!(set.rep_count, 8);
        assert_eq!(set.weight, 62.5);
        assert_eq!(set.intensity, 8.0);

        let negative: WorkoutSet = serde_json::from_value(serde_json::json!({
            "exercise": "ex1",
            "session": "s1",
            "repCount": -3,
            "createdAt": "2024-01-15T10:00:00.000Z",
            "updatedAt": "2024-01-15T10:00:00.000Z",
        }))
        .unwrap();
        assert_eq!(negative.rep_count, 0);
    }

    #[test]
    fn test_fractional_reps_round() {
        let mut draft = SetDraft::new("ex1", 0, 20.0);
        draft.reps = Some(4.6);
        assert_eq!(draft.rep_count(), 5);
        assert_eq!(draft.score(), 100.0);

        draft.reps = Some(4.4);
        assert_eq!(draft.rep_count(), 4);
    }
}
