// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use liftlog::config::Config;
use liftlog::db::{FirestoreStore, MemoryStore};
use liftlog::models::{Exercise, ExerciseDraft, MuscleGroupRef, Session};
use liftlog::Tracker;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreStore {
    FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Tracker over a fresh in-memory store.
///
/// The returned store shares its data with the tracker's.
#[allow(dead_code)]
pub fn memory_tracker() -> (Tracker<MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    (Tracker::new(Config::default(), store.clone()), store)
}

/// Generate a unique ID suffix for test isolation.
#[allow(dead_code)]
pub fn unique_user() -> String {
    format!("user-{}", uuid::Uuid::new_v4().simple())
}

/// Bench-press style exercise: Chest/Mid Chest with shoulder and tricep help.
#[allow(dead_code)]
pub fn bench_press_draft() -> ExerciseDraft {
    ExerciseDraft {
        name: "Bench Press".to_string(),
        primary_muscle_group: MuscleGroupRef::new("Chest", Some("Mid Chest")),
        secondary_muscle_groups: vec![
            MuscleGroupRef::new("Shoulders", Some("Front Delt")),
            MuscleGroupRef::new("Triceps", Some("Long Head")),
        ],
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn overhead_press_draft() -> ExerciseDraft {
    ExerciseDraft {
        name: "Overhead Press".to_string(),
        primary_muscle_group: MuscleGroupRef::new("Shoulders", Some("Front Delt")),
        secondary_muscle_groups: vec![MuscleGroupRef::new("Triceps", Some("Lateral Head"))],
        ..Default::default()
    }
}

/// Create a bench press exercise and an empty session for `user`.
#[allow(dead_code)]
pub async fn setup_bench_session(tracker: &Tracker<MemoryStore>, user: &str) -> (Exercise, Session) {
    let exercise = tracker
        .exercises
        .create_exercise(user, &bench_press_draft())
        .await
        .expect("Failed to create exercise");
    let session = tracker
        .sessions
        .create_session(user, Default::default())
        .await
        .expect("Failed to create session");
    (exercise, session)
}
