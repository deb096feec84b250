//! Library configuration loaded from environment variables.

use crate::models::volume::{MuscleGroupGranularity, VolumeMetric};
use std::env;
use std::ops::RangeInclusive;

/// Accepted lengths of the weekly volume window, in days.
pub const WINDOW_DAYS: RangeInclusive<i64> = 1..=366;

/// Configuration, loaded once by the host application.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project holding the Firestore database
    pub gcp_project_id: String,
    /// Metric used when the caller doesn't pick one
    pub default_metric: VolumeMetric,
    /// Muscle-group granularity used when the caller doesn't pick one
    pub default_granularity: MuscleGroupGranularity,
    /// Length of the trailing window for weekly volume, in days
    pub weekly_window_days: i64,
    /// How many recent completed sets to return per exercise
    pub recent_sets_limit: u32,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            default_metric: VolumeMetric::Sets,
            default_granularity: MuscleGroupGranularity::Simple,
            weekly_window_days: 7,
            recent_sets_limit: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            default_metric: parse_var("LIFTLOG_DEFAULT_METRIC", VolumeMetric::Sets)?,
            default_granularity: parse_var(
                "LIFTLOG_DEFAULT_GRANULARITY",
                MuscleGroupGranularity::Simple,
            )?,
            weekly_window_days: parse_in_range("LIFTLOG_WEEKLY_WINDOW_DAYS", 7, WINDOW_DAYS)?,
            recent_sets_limit: parse_var("LIFTLOG_RECENT_SETS_LIMIT", 3)?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw.clone())),
        Err(_) => Ok(default),
    }
}

fn parse_in_range(
    name: &'static str,
    default: i64,
    range: RangeInclusive<i64>,
) -> Result<i64, ConfigError> {
    let value = parse_var(name, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(name, value.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}
