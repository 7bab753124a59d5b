//! Storage backends.
//!
//! The store only talks to [`WorkoutBackend`]. Two generations exist on
//! disk: the legacy flat key-value file and the structured SQLite layout.
//! Which one is used is decided once, at startup, by [`open_backend`].

use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    error::{StoreError, StoreResult},
    models::{CompletedWorkout, WorkoutPreset},
};

mod flat;
#[cfg(test)]
mod memory;
mod sqlite;

pub use flat::{FlatBackend, KeyValueFile, COMPLETED_WORKOUTS_KEY, PRESETS_KEY};
#[cfg(test)]
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// File name of the flat key-value store inside the data directory.
pub const FLAT_FILE: &str = "defaults.json";
/// File name of the SQLite database inside the data directory.
pub const DB_FILE: &str = "pumppad.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Flat,
    #[default]
    Structured,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Flat => "flat",
            Self::Structured => "structured",
        };

        write!(f, "{}", s)
    }
}

/// Persistence for the two collections the store owns.
///
/// Saves always receive the whole collection and replace whatever was
/// stored before. Loads return entities in the order they were saved.
#[async_trait]
pub trait WorkoutBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn load_presets(&self) -> StoreResult<Vec<WorkoutPreset>>;

    async fn save_presets(&self, presets: &[WorkoutPreset]) -> StoreResult<()>;

    async fn load_history(&self) -> StoreResult<Vec<CompletedWorkout>>;

    async fn save_history(&self, workouts: &[CompletedWorkout]) -> StoreResult<()>;

    /// Releases any held resources. Called once at shutdown.
    async fn close(&self) {}
}

pub fn flat_path(data_dir: &Path) -> PathBuf {
    data_dir.join(FLAT_FILE)
}

pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE)
}

/// Opens the requested backend under `data_dir`.
///
/// A structured backend that cannot be initialised degrades to the flat
/// file. If the flat file cannot be opened either, nothing is persisted and
/// the error is returned to the caller as fatal.
pub async fn open_backend(kind: BackendKind, data_dir: &Path) -> StoreResult<Box<dyn WorkoutBackend>> {
    if kind == BackendKind::Structured {
        let path = db_path(data_dir);
        match SqliteBackend::open(&path).await {
            Ok(backend) => return Ok(Box::new(backend)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "structured storage failed to initialise; falling back to flat file"
                );
            }
        }
    }

    let path = flat_path(data_dir);
    match KeyValueFile::open_or_empty(&path) {
        Ok(file) => Ok(Box::new(FlatBackend::new(file))),
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "flat storage failed to initialise");
            Err(StoreError::Unavailable(format!("{}: {}", path.display(), e)))
        }
    }
}
