// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Training volume per muscle group for the progress chart.
//!
//! Volume is computed on demand from a list of sets and the exercise
//! catalog; nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{Exercise, WorkoutSet};

/// Share of a set credited to each secondary muscle group.
pub const SECONDARY_WEIGHT: f64 = 0.5;

/// Unit of volume a set contributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeMetric {
    /// One per set
    #[default]
    Sets,
    /// The set's rep count
    Reps,
}

impl VolumeMetric {
    fn unit(self, set: &WorkoutSet) -> f64 {
        match self {
            VolumeMetric::Sets => 1.0,
            VolumeMetric::Reps => f64::from(set.rep_count),
        }
    }
}

/// Which name of a muscle group keys the breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuscleGroupGranularity {
    /// Broad group ("Chest")
    #[default]
    Simple,
    /// Sub-region ("Upper Chest")
    Specific,
}

impl FromStr for VolumeMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sets" => Ok(VolumeMetric::Sets),
            "reps" => Ok(VolumeMetric::Reps),
            other => Err(format!("unknown volume metric: {}", other)),
        }
    }
}

impl FromStr for MuscleGroupGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(MuscleGroupGranularity::Simple),
            "specific" => Ok(MuscleGroupGranularity::Specific),
            other => Err(format!("unknown muscle group granularity: {}", other)),
        }
    }
}

impl fmt::Display for VolumeMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VolumeMetric::Sets => "sets",
            VolumeMetric::Reps => "reps",
        })
    }
}

impl fmt::Display for MuscleGroupGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MuscleGroupGranularity::Simple => "simple",
            MuscleGroupGranularity::Specific => "specific",
        })
    }
}

/// Volume credited to one muscle group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MuscleVolume {
    /// Completed sets where this group was the primary target
    pub primary: f64,
    /// Completed sets where this group was a secondary target (half weight)
    pub secondary: f64,
    /// Planned sets, primary and secondary together
    pub goal: f64,
}

impl MuscleVolume {
    pub fn total(&self) -> f64 {
        self.primary + self.secondary + self.goal
    }
}

/// Volume keyed by muscle-group name.
///
/// Groups that never received a contribution are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeBreakdown {
    groups: BTreeMap<String, MuscleVolume>,
}

impl VolumeBreakdown {
    pub fn get(&self, group: &str) -> Option<&MuscleVolume> {
        self.groups.get(group)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MuscleVolume)> {
        self.groups.iter().map(|(name, volume)| (name.as_str(), volume))
    }

    /// Groups with a positive total, in name order (the bars the chart draws).
    pub fn chart_rows(&self) -> Vec<(&str, &MuscleVolume)> {
        self.iter().filter(|(_, volume)| volume.total() > 0.0).collect()
    }

    pub fn into_map(self) -> BTreeMap<String, MuscleVolume> {
        self.groups
    }

    /// Credit one set to the groups its exercise trains.
    fn add_set(
        &mut self,
        set: &WorkoutSet,
        exercise: &Exercise,
        metric: VolumeMetric,
        granularity: MuscleGroupGranularity,
    ) {
        let unit = metric.unit(set);
        let is_goal = set.is_goal();
        let groups = &exercise.muscle_groups;

        if let Some(name) = groups.primary.name(granularity) {
            let volume = self.entry(name);
            if is_goal {
                volume.goal += unit;
            } else {
                volume.primary += unit;
            }
        }

        for secondary in &groups.secondary {
            if let Some(name) = secondary.name(granularity) {
                let share = unit * SECONDARY_WEIGHT;
                let volume = self.entry(name);
                if is_goal {
                    volume.goal += share;
                } else {
                    volume.secondary += share;
                }
            }
        }
    }

    fn entry(&mut self, name: &str) -> &mut MuscleVolume {
        self.groups.entry(name.to_string()).or_default()
    }
}

/// Compute the per-muscle-group volume of `sets`.
///
/// Sets whose exercise is not in `exercises` are skipped. The result does
/// not depend on the order of `sets`.
pub fn aggregate(
    sets: &[WorkoutSet],
    exercises: &[Exercise],
    metric: VolumeMetric,
    granularity: MuscleGroupGranularity,
) -> VolumeBreakdown {
    let catalog: HashMap<&str, &Exercise> = exercises
        .iter()
        .map(|exercise| (exercise.id.as_str(), exercise))
        .collect();

    let mut breakdown = VolumeBreakdown::default();
    for set in sets {
        let Some(exercise) = catalog.get(set.exercise.as_str()) else {
            continue;
        };
        breakdown.add_set(set, exercise, metric, granularity);
    }
    breakdown
}
