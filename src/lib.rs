// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Liftlog: personal records and training volume for a workout tracker
//!
//! This crate keeps each exercise's personal-record history consistent as
//! sets are logged, edited and deleted, and computes per-muscle-group
//! training volume for progress charts.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::{DocumentStore, FirestoreStore};
use error::Result;
use services::{ExerciseService, PrLedger, RoutineService, SessionService, SetService};

/// Shared application state.
///
/// All services share one store.
pub struct Tracker<S> {
    pub config: Config,
    pub store: Arc<S>,
    pub ledger: PrLedger<S>,
    pub exercises: ExerciseService<S>,
    pub sessions: SessionService<S>,
    pub sets: SetService<S>,
    pub routines: RoutineService<S>,
}

impl<S: DocumentStore> Tracker<S> {
    pub fn new(config: Config, store: S) -> Self {
        let store = Arc::new(store);
        let ledger = PrLedger::new(store.clone());
        let exercises = ExerciseService::new(store.clone());
        let sessions = SessionService::new(
            store.clone(),
            config.default_metric,
            config.default_granularity,
            config.weekly_window_days,
        );
        let sets = SetService::new(
            store.clone(),
            ledger.clone(),
            exercises.clone(),
            sessions.clone(),
            config.weekly_window_days,
            config.recent_sets_limit,
        );
        let routines = RoutineService::new(store.clone());

        Self {
            config,
            store,
            ledger,
            exercises,
            sessions,
            sets,
            routines,
        }
    }
}

impl Tracker<FirestoreStore> {
    /// Connect to Firestore for `config.gcp_project_id`.
    pub async fn connect(config: Config) -> Result<Self> {
        let store = FirestoreStore::new(&config.gcp_project_id).await?;
        tracing::info!(project = %config.gcp_project_id, "Tracker ready");
        Ok(Self::new(config, store))
    }
}
