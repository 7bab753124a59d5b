use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One planned set, filled in with what was actually lifted once performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    pub id: Uuid,
    /// Single number ("10") or a range ("8-10").
    pub target_reps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl WorkoutSet {
    pub fn new(target_reps: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_reps: target_reps.into(),
            actual_reps: None,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.actual_reps.is_some()
    }

    /// Parsed form of `target_reps`, `None` for free-form text.
    pub fn rep_target(&self) -> Option<RepTarget> {
        self.target_reps.parse().ok()
    }
}

/// An exercise and its sets, in the order they are performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub sets: Vec<WorkoutSet>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, sets: Vec<WorkoutSet>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            sets,
        }
    }
}

/// A reusable workout plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPreset {
    pub id: Uuid,
    pub name: String,
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub notes: String,
    pub date_created: DateTime<Utc>,
}

impl WorkoutPreset {
    pub fn new(name: impl Into<String>, exercises: Vec<Exercise>, notes: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            exercises,
            notes: notes.into(),
            date_created: Utc::now(),
        }
    }

    /// Checks the naming invariants of the preset and everything it owns.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyPresetName);
        }
        for (ex_idx, exercise) in self.exercises.iter().enumerate() {
            if exercise.name.trim().is_empty() {
                return Err(ValidationError::EmptyExerciseName { exercise: ex_idx + 1 });
            }
            for (set_idx, set) in exercise.sets.iter().enumerate() {
                if set.target_reps.trim().is_empty() {
                    return Err(ValidationError::EmptyTargetReps {
                        exercise: ex_idx + 1,
                        set: set_idx + 1,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("preset name must not be empty")]
    EmptyPresetName,
    #[error("exercise {exercise} has an empty name")]
    EmptyExerciseName { exercise: usize },
    #[error("exercise {exercise}, set {set} has no target reps")]
    EmptyTargetReps { exercise: usize, set: usize },
}

/// Historical record of one finished session.
/// `preset_id` is a lookup-only reference; the preset may no longer exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedWorkout {
    pub id: Uuid,
    pub preset_id: Uuid,
    pub preset_name: String,
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub notes: String,
    pub date_completed: DateTime<Utc>,
    /// Elapsed seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl CompletedWorkout {
    pub fn from_preset(preset: &WorkoutPreset, exercises: Vec<Exercise>, duration: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            preset_id: preset.id,
            preset_name: preset.name.clone(),
            exercises,
            notes: preset.notes.clone(),
            date_completed: Utc::now(),
            duration,
        }
    }

    pub fn summary(&self) -> WorkoutSummary {
        let sets = self.exercises.iter().flat_map(|e| e.sets.iter());

        let mut summary = WorkoutSummary::default();
        for set in sets {
            summary.total_sets += 1;
            if let Some(reps) = set.actual_reps {
                summary.completed_sets += 1;
                summary.total_reps += reps;
                if let Some(weight) = set.weight {
                    summary.total_volume += reps as f64 * weight;
                }
            }
        }
        summary
    }
}

/// Totals shown under a finished workout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WorkoutSummary {
    pub completed_sets: usize,
    pub total_sets: usize,
    pub total_reps: u32,
    pub total_volume: f64,
}

/// Parsed target reps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepTarget {
    Exact(u32),
    Range(u32, u32),
}

impl RepTarget {
    pub fn contains(&self, reps: u32) -> bool {
        match *self {
            Self::Exact(n) => reps == n,
            Self::Range(lo, hi) => (lo..=hi).contains(&reps),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid rep target `{0}`")]
pub struct ParseRepTargetError(String);

impl FromStr for RepTarget {
    type Err = ParseRepTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRepTargetError(s.to_string());
        let num = |part: &str| part.trim().parse::<u32>().map_err(|_| err());

        match s.split_once('-') {
            None => Ok(Self::Exact(num(s)?)),
            Some((lo, hi)) => {
                let (lo, hi) = (num(lo)?, num(hi)?);
                if lo > hi {
                    return Err(err());
                }
                Ok(Self::Range(lo, hi))
            }
        }
    }
}

impl Display for RepTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{}", n),
            Self::Range(lo, hi) => write!(f, "{}-{}", lo, hi),
        }
    }
}
