// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Logging, editing and deleting sets end to end on the in-memory store.

use chrono::{Duration, Utc};
use liftlog::db::{collections, DocumentStore, FieldUpdate};
use liftlog::error::AppError;
use liftlog::models::SetDraft;
use liftlog::time_utils::format_utc_rfc3339;
use serde_json::json;

mod common;
use common::{memory_tracker, overhead_press_draft, setup_bench_session, unique_user};

#[tokio::test]
async fn test_log_set_computes_score_and_attaches_to_session() {
    let (tracker, _store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;

    let logged = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 8, 60.0))
        .await
        .unwrap();

    assert_eq!(logged.set.score, 480.0);
    assert_eq!(logged.set.exercise_name, "Bench Press");
    assert!(logged.set.is_pr);
    assert!(logged.promotion.is_promoted());

    let stored = tracker.sets.get_set(&logged.set.id).await.unwrap();
    assert_eq!(stored.rep_count, 8);
    assert!(stored.is_pr);

    let session = tracker.sessions.get_session(&session.id).await.unwrap();
    assert_eq!(session.sets, vec![logged.set.id.clone()]);
}

#[tokio::test]
async fn test_log_set_with_missing_values_scores_zero() {
    let (tracker, _store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;

    let draft = SetDraft {
        exercise: exercise.id.clone(),
        reps: None,
        weight: Some(f64::NAN),
        complete: true,
        ..Default::default()
    };
    let logged = tracker
        .sets
        .log_set(&user, &session.id, &draft)
        .await
        .unwrap();

    assert_eq!(logged.set.rep_count, 0);
    assert_eq!(logged.set.weight, 0.0);
    assert_eq!(logged.set.score, 0.0);
}

#[tokio::test]
async fn test_log_set_rejects_bad_draft() {
    let (tracker, store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;
    let writes_before = store.write_count();

    let mut draft = SetDraft::new(&exercise.id, 5, 50.0);
    draft.intensity = Some(11.0);
    let result = tracker.sets.log_set(&user, &session.id, &draft).await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    let result = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new("", 5, 50.0))
        .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    let result = tracker
        .sets
        .log_set(&user, "no-such-session", &SetDraft::new(&exercise.id, 5, 50.0))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    assert_eq!(store.write_count(), writes_before);
}

#[tokio::test]
async fn test_second_better_set_takes_over_pr() {
    let (tracker, _store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;

    let first = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 60.0))
        .await
        .unwrap();
    let tie = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 6, 50.0))
        .await
        .unwrap();
    let better = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 70.0))
        .await
        .unwrap();

    assert!(first.set.is_pr);
    assert!(!tie.set.is_pr);
    assert!(better.set.is_pr);

    let exercise = tracker.exercises.get_exercise(&exercise.id).await.unwrap();
    assert_eq!(exercise.pr.current_pr.unwrap().set_id, better.set.id);
    assert_eq!(exercise.pr.past_prs.len(), 1);
    assert_eq!(exercise.pr.past_prs[0].set_id, first.set.id);
}

#[tokio::test]
async fn test_deleting_pr_set_rolls_back() {
    let (tracker, _store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;

    let first = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 60.0))
        .await
        .unwrap();
    let best = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 80.0))
        .await
        .unwrap();

    let history = tracker
        .sets
        .delete_set(&best.set.id)
        .await
        .unwrap()
        .expect("deleting the PR set should roll back");
    assert_eq!(history.current_pr.as_ref().unwrap().set_id, first.set.id);
    assert!(history.past_prs.is_empty());

    let result = tracker.sets.get_set(&best.set.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let session = tracker.sessions.get_session(&session.id).await.unwrap();
    assert_eq!(session.sets, vec![first.set.id.clone()]);
}

#[tokio::test]
async fn test_deleting_superseded_pr_set_keeps_current_pr() {
    let (tracker, _store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;

    let first = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 20.0))
        .await
        .unwrap();
    let better = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 30.0))
        .await
        .unwrap();

    let stored = tracker.sets.get_set(&first.set.id).await.unwrap();
    assert!(!stored.is_pr);

    let rolled_back = tracker.sets.delete_set(&first.set.id).await.unwrap();
    assert!(rolled_back.is_none());

    let exercise = tracker.exercises.get_exercise(&exercise.id).await.unwrap();
    let current = exercise.pr.current_pr.unwrap();
    assert_eq!(current.set_id, better.set.id);
    assert_eq!(current.score, 150.0);
    assert_eq!(exercise.pr.past_prs.len(), 1);
    assert!(tracker.sets.get_set(&better.set.id).await.unwrap().is_pr);
}

#[tokio::test]
async fn test_deleting_non_pr_set_keeps_pr() {
    let (tracker, _store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;

    let best = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 80.0))
        .await
        .unwrap();
    let warmup = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 10, 20.0))
        .await
        .unwrap();

    let rolled_back = tracker.sets.delete_set(&warmup.set.id).await.unwrap();
    assert!(rolled_back.is_none());

    let exercise = tracker.exercises.get_exercise(&exercise.id).await.unwrap();
    assert_eq!(exercise.pr.current_pr.unwrap().set_id, best.set.id);
}

#[tokio::test]
async fn test_edit_lowering_pr_set_restores_previous() {
    let (tracker, _store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;

    let first = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 60.0))
        .await
        .unwrap();
    let best = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 80.0))
        .await
        .unwrap();

    // Typo fix: it was really 5 × 50
    let edited = tracker
        .sets
        .edit_set(&best.set.id, &SetDraft::new(&exercise.id, 5, 50.0))
        .await
        .unwrap();
    assert!(!edited.promotion.is_promoted());
    assert!(!edited.set.is_pr);
    assert_eq!(edited.set.score, 250.0);

    let stored = tracker.sets.get_set(&best.set.id).await.unwrap();
    assert!(!stored.is_pr);
    assert_eq!(stored.score, 250.0);
    assert_eq!(stored.created_at, best.set.created_at);

    let exercise = tracker.exercises.get_exercise(&exercise.id).await.unwrap();
    assert_eq!(exercise.pr.current_pr.unwrap().set_id, first.set.id);
}

#[tokio::test]
async fn test_edit_raising_pr_set_keeps_it_as_pr() {
    let (tracker, _store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;

    let best = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 80.0))
        .await
        .unwrap();

    let edited = tracker
        .sets
        .edit_set(&best.set.id, &SetDraft::new(&exercise.id, 5, 85.0))
        .await
        .unwrap();
    assert!(edited.set.is_pr);

    let exercise = tracker.exercises.get_exercise(&exercise.id).await.unwrap();
    let current = exercise.pr.current_pr.unwrap();
    assert_eq!(current.set_id, best.set.id);
    assert_eq!(current.score, 425.0);
}

#[tokio::test]
async fn test_edit_moving_set_to_other_exercise() {
    let (tracker, _store) = memory_tracker();
    let user = unique_user();
    let (bench, session) = setup_bench_session(&tracker, &user).await;
    let press = tracker
        .exercises
        .create_exercise(&user, &overhead_press_draft())
        .await
        .unwrap();

    let logged = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&bench.id, 5, 40.0))
        .await
        .unwrap();
    assert!(logged.set.is_pr);

    // Logged under the wrong exercise
    let edited = tracker
        .sets
        .edit_set(&logged.set.id, &SetDraft::new(&press.id, 5, 40.0))
        .await
        .unwrap();
    assert!(edited.set.is_pr);
    assert_eq!(edited.set.exercise_name, "Overhead Press");

    let bench = tracker.exercises.get_exercise(&bench.id).await.unwrap();
    assert!(bench.pr.current_pr.is_none());

    let press = tracker.exercises.get_exercise(&press.id).await.unwrap();
    assert_eq!(press.pr.current_pr.unwrap().set_id, logged.set.id);
}

#[tokio::test]
async fn test_edit_survives_deleted_original_exercise() {
    let (tracker, _store) = memory_tracker();
    let user = unique_user();
    let (bench, session) = setup_bench_session(&tracker, &user).await;
    let press = tracker
        .exercises
        .create_exercise(&user, &overhead_press_draft())
        .await
        .unwrap();

    let logged = tracker
        .sets
        .log_set(&user, &session.id, &SetDraft::new(&bench.id, 5, 40.0))
        .await
        .unwrap();
    tracker.exercises.delete_exercise(&bench.id).await.unwrap();

    let edited = tracker
        .sets
        .edit_set(&logged.set.id, &SetDraft::new(&press.id, 5, 40.0))
        .await
        .unwrap();
    assert!(edited.set.is_pr);
}

#[tokio::test]
async fn test_delete_missing_set_is_not_found() {
    let (tracker, _store) = memory_tracker();
    let result = tracker.sets.delete_set("nope").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_recent_completed_sets_newest_first() {
    let (tracker, store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;

    let mut logged = Vec::new();
    for weight in [40.0, 45.0, 50.0, 55.0] {
        let set = tracker
            .sets
            .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, weight))
            .await
            .unwrap()
            .set;
        logged.push(set);
    }
    tracker
        .sets
        .log_set(
            &user,
            &session.id,
            &SetDraft::new(&exercise.id, 5, 100.0).planned(),
        )
        .await
        .unwrap();

    // Spread creation times so ordering is unambiguous
    let base = Utc::now() - Duration::hours(1);
    for (i, set) in logged.iter().enumerate() {
        store
            .update_document(
                collections::SETS,
                &set.id,
                FieldUpdate::new().set(
                    "createdAt",
                    json!(format_utc_rfc3339(base + Duration::minutes(i as i64))),
                ),
            )
            .await
            .unwrap();
    }

    let recent = tracker
        .sets
        .recent_completed_sets(&user, &exercise.id)
        .await
        .unwrap();

    let weights: Vec<f64> = recent.iter().map(|s| s.weight).collect();
    assert_eq!(weights, vec![55.0, 50.0, 45.0]);

    let other_user = tracker
        .sets
        .recent_completed_sets("someone-else", &exercise.id)
        .await
        .unwrap();
    assert!(other_user.is_empty());
}

#[tokio::test]
async fn test_sets_in_window() {
    let (tracker, store) = memory_tracker();
    let user = unique_user();
    let (exercise, session) = setup_bench_session(&tracker, &user).await;

    let end = Utc::now();
    let mut ids = Vec::new();
    for days_ago in [1, 6, 9] {
        let set = tracker
            .sets
            .log_set(&user, &session.id, &SetDraft::new(&exercise.id, 5, 40.0))
            .await
            .unwrap()
            .set;
        store
            .update_document(
                collections::SETS,
                &set.id,
                FieldUpdate::new().set(
                    "createdAt",
                    json!(format_utc_rfc3339(end - Duration::days(days_ago))),
                ),
            )
            .await
            .unwrap();
        ids.push(set.id);
    }

    let in_window = tracker.sets.sets_in_window(&user, end).await.unwrap();
    let found: Vec<&str> = in_window.iter().map(|s| s.id.as_str()).collect();

    // Oldest first; the nine-day-old set is outside the window
    assert_eq!(found, vec![ids[1].as_str(), ids[0].as_str()]);
}
