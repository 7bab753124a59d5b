//! One-time import of legacy flat data into the structured backend.
//!
//! Legacy entities are merged into the target by id: an id already present
//! is replaced in place, a new id is appended. Running the import again over
//! the same legacy data therefore cannot duplicate anything, which covers a
//! crash between writing the structured data and setting the flag.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    backend::{COMPLETED_WORKOUTS_KEY, KeyValueFile, PRESETS_KEY, WorkoutBackend},
    error::StoreResult,
    models::{CompletedWorkout, WorkoutPreset},
};

/// Completion flag for the flat → structured migration. Bump the version
/// suffix for any future layout change so a new pass runs.
pub const MIGRATION_FLAG_KEY: &str = "has_migrated_to_structured_v1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// The flag was already set; nothing was read or written.
    pub skipped: bool,
    pub presets: usize,
    pub completed_workouts: usize,
}

/// Moves legacy presets and history from `legacy` into `target`, then sets
/// the flag and deletes the legacy blobs.
///
/// Absent blobs count as empty. A blob that does not decode aborts the
/// migration before anything is written, leaving the legacy data in place.
pub async fn migrate_legacy(
    legacy: &KeyValueFile,
    target: &dyn WorkoutBackend,
) -> StoreResult<MigrationReport> {
    if legacy.get_bool(MIGRATION_FLAG_KEY) {
        tracing::debug!("legacy migration already complete");
        return Ok(MigrationReport {
            skipped: true,
            ..Default::default()
        });
    }

    let old_presets: Vec<WorkoutPreset> = legacy.get(PRESETS_KEY)?.unwrap_or_default();
    let old_history: Vec<CompletedWorkout> = legacy.get(COMPLETED_WORKOUTS_KEY)?.unwrap_or_default();

    let mut report = MigrationReport::default();

    if !old_presets.is_empty() {
        let mut presets = target.load_presets().await?;
        report.presets = merge_by_id(&mut presets, old_presets, |p| p.id);
        target.save_presets(&presets).await?;
    }

    if !old_history.is_empty() {
        let mut history = target.load_history().await?;
        report.completed_workouts = merge_by_id(&mut history, old_history, |w| w.id);
        target.save_history(&history).await?;
    }

    legacy.set(MIGRATION_FLAG_KEY, &true)?;
    legacy.remove(PRESETS_KEY)?;
    legacy.remove(COMPLETED_WORKOUTS_KEY)?;

    tracing::info!(
        presets = report.presets,
        completed_workouts = report.completed_workouts,
        "migrated legacy data"
    );
    Ok(report)
}

/// Upserts `incoming` into `existing`, keyed by `id_of`, and returns how
/// many distinct ids came in. Replaced entries keep their position; new ones
/// go to the end. Repeated incoming ids collapse to their last occurrence.
fn merge_by_id<T>(existing: &mut Vec<T>, incoming: Vec<T>, id_of: impl Fn(&T) -> Uuid) -> usize {
    let mut seen = HashSet::new();
    for item in incoming {
        let id = id_of(&item);
        seen.insert(id);
        match existing.iter().position(|e| id_of(e) == id) {
            Some(idx) => existing[idx] = item,
            None => existing.push(item),
        }
    }
    seen.len()
}
