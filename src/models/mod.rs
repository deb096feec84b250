// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod exercise;
pub mod pr;
pub mod routine;
pub mod session;
pub mod set;
pub mod volume;

pub use exercise::{Exercise, ExerciseDraft, MuscleGroupRef, MuscleGroups};
pub use pr::{PrHistory, PrRecord};
pub use routine::{Routine, RoutineDraft};
pub use session::{Session, SessionStatus};
pub use set::{SetDraft, WorkoutSet};
pub use volume::{aggregate, MuscleGroupGranularity, MuscleVolume, VolumeBreakdown, VolumeMetric};
