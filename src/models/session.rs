//! Workout session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::db::{Revision, StoredDocument};

/// Session document stored in the `sessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Document ID
    #[serde(skip)]
    pub id: String,
    /// Revision the document was read at
    #[serde(skip)]
    pub revision: Option<Revision>,
    /// Owning user
    pub user: String,
    #[serde(with = "crate::time_utils::rfc3339")]
    pub start_date: DateTime<Utc>,
    pub status: SessionStatus,
    /// IDs of the sets logged in this session
    #[serde(default)]
    pub sets: Vec<String>,
    /// Training split tags used to filter the exercise picker
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
}

impl StoredDocument for Session {
    fn attach(&mut self, id: String, revision: Revision) {
        self.id = id;
        self.revision = Some(revision);
    }
}
