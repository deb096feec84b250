// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod exercises;
pub mod ledger;
pub mod routines;
pub mod sessions;
pub mod sets;

pub use exercises::ExerciseService;
pub use ledger::{PrLedger, PromotionOutcome};
pub use routines::RoutineService;
pub use sessions::SessionService;
pub use sets::{LoggedSet, SetService};

use crate::db::{Snapshot, StoredDocument};
use crate::error::Result;

/// Decode query results, failing on the first malformed document.
pub(crate) fn decode_all<T: StoredDocument>(snapshots: &[Snapshot]) -> Result<Vec<T>> {
    snapshots.iter().map(Snapshot::decode).collect()
}
