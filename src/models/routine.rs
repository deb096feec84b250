//! Saved routine model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

use crate::db::{Revision, StoredDocument};

/// Routine document stored in the `routines` collection: a named list of
/// exercises to plan into a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    /// Document ID
    #[serde(skip)]
    pub id: String,
    /// Owning user
    pub user: String,
    pub name: String,
    /// Training split tags, matched against a session's categories
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// Exercise document IDs, in the order they are performed
    #[serde(default)]
    pub exercises: Vec<String>,
    #[serde(with = "crate::time_utils::rfc3339")]
    pub created_date: DateTime<Utc>,
}

impl Routine {
    /// Whether the routine fits a session tagged with `categories`.
    ///
    /// An untagged session accepts every routine.
    pub fn fits_session(&self, categories: &BTreeSet<String>) -> bool {
        categories.is_empty() || !self.categories.is_disjoint(categories)
    }
}

impl StoredDocument for Routine {
    fn attach(&mut self, id: String, _revision: Revision) {
        self.id = id;
    }
}

/// User-supplied routine fields.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoutineDraft {
    #[validate(length(min = 1, message = "routine name is required"))]
    pub name: String,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[validate(length(min = 1, message = "a routine needs at least one exercise"))]
    pub exercises: Vec<String>,
}
