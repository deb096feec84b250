// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise catalog model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::db::{Revision, StoredDocument};
use crate::error::{AppError, Result};
use crate::models::volume::MuscleGroupGranularity;
use crate::models::PrHistory;

/// Maximum number of secondary muscle groups per exercise.
pub const MAX_SECONDARY_GROUPS: usize = 3;

/// A muscle group as a broad name plus an optional finer sub-region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MuscleGroupRef {
    /// Broad group (e.g., "Chest")
    pub simple: String,
    /// Sub-region (e.g., "Upper Chest")
    #[serde(default)]
    pub specific: Option<String>,
}

impl MuscleGroupRef {
    pub fn new(simple: &str, specific: Option<&str>) -> Self {
        Self {
            simple: simple.to_string(),
            specific: specific.map(str::to_string),
        }
    }

    /// Group name at the requested granularity, if present and non-empty.
    pub fn name(&self, granularity: MuscleGroupGranularity) -> Option<&str> {
        let name = match granularity {
            MuscleGroupGranularity::Simple => Some(self.simple.as_str()),
            MuscleGroupGranularity::Specific => self.specific.as_deref(),
        };
        name.filter(|n| !n.is_empty())
    }

    fn normalized(&self) -> Self {
        Self {
            simple: self.simple.trim().to_string(),
            specific: self
                .specific
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

/// Muscles an exercise trains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuscleGroups {
    pub primary: MuscleGroupRef,
    #[serde(default)]
    pub secondary: Vec<MuscleGroupRef>,
}

/// Exercise document stored in the `exercises` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    /// Document ID
    #[serde(skip)]
    pub id: String,
    /// Revision the document was read at, if it came from the store
    #[serde(skip)]
    pub revision: Option<Revision>,
    /// Owning user
    pub user: String,
    pub name: String,
    #[serde(default)]
    pub variation: String,
    #[serde(default)]
    pub rep_range: String,
    /// Training split tags
    #[serde(default)]
    pub categories: BTreeSet<String>,
    pub muscle_groups: MuscleGroups,
    #[serde(default)]
    pub pr: PrHistory,
    #[serde(with = "crate::time_utils::rfc3339")]
    pub created_date: DateTime<Utc>,
}

impl StoredDocument for Exercise {
    fn attach(&mut self, id: String, revision: Revision) {
        self.id = id;
        self.revision = Some(revision);
    }
}

/// User-supplied exercise fields for create and update.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDraft {
    #[validate(length(min = 1, message = "exercise name is required"))]
    pub name: String,
    #[serde(default)]
    pub variation: String,
    #[serde(default)]
    pub rep_range: String,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    pub primary_muscle_group: MuscleGroupRef,
    /// Form rows; rows without a broad group are ignored
    #[serde(default)]
    pub secondary_muscle_groups: Vec<MuscleGroupRef>,
}

impl ExerciseDraft {
    /// Validate the draft and build the stored muscle-group layout.
    pub fn muscle_groups(&self) -> Result<MuscleGroups> {
        self.validate()?;

        let primary = self.primary_muscle_group.normalized();
        if primary.simple.is_empty() {
            return Err(AppError::InvalidInput(
                "primary muscle group is required".to_string(),
            ));
        }

        let secondary: Vec<MuscleGroupRef> = self
            .secondary_muscle_groups
            .iter()
            .map(MuscleGroupRef::normalized)
            .filter(|group| !group.simple.is_empty())
            .collect();

        if secondary.len() > MAX_SECONDARY_GROUPS {
            return Err(AppError::InvalidInput(format!(
                "at most {} secondary muscle groups are allowed",
                MAX_SECONDARY_GROUPS
            )));
        }

        Ok(MuscleGroups { primary, secondary })
    }
}
