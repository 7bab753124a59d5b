//! In-memory backend, compiled for tests only.

use std::sync::RwLock;

use async_trait::async_trait;

use super::{BackendKind, WorkoutBackend};
use crate::{
    error::StoreResult,
    models::{CompletedWorkout, WorkoutPreset},
};

/// Keeps saved collections in process memory. Reports itself as `Flat`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    presets: RwLock<Vec<WorkoutPreset>>,
    history: RwLock<Vec<CompletedWorkout>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(presets: Vec<WorkoutPreset>, history: Vec<CompletedWorkout>) -> Self {
        Self {
            presets: RwLock::new(presets),
            history: RwLock::new(history),
        }
    }
}

#[async_trait]
impl WorkoutBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Flat
    }

    async fn load_presets(&self) -> StoreResult<Vec<WorkoutPreset>> {
        let presets = self.presets.read().unwrap_or_else(|e| e.into_inner());
        Ok(presets.clone())
    }

    async fn save_presets(&self, presets: &[WorkoutPreset]) -> StoreResult<()> {
        let mut stored = self.presets.write().unwrap_or_else(|e| e.into_inner());
        *stored = presets.to_vec();
        Ok(())
    }

    async fn load_history(&self) -> StoreResult<Vec<CompletedWorkout>> {
        let history = self.history.read().unwrap_or_else(|e| e.into_inner());
        Ok(history.clone())
    }

    async fn save_history(&self, workouts: &[CompletedWorkout]) -> StoreResult<()> {
        let mut stored = self.history.write().unwrap_or_else(|e| e.into_inner());
        *stored = workouts.to_vec();
        Ok(())
    }
}
