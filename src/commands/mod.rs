use colored::Colorize;

use crate::store::WorkoutStore;

pub mod config;
pub mod db;
pub mod history;
pub mod preset;
pub mod workout;

/// Resolves a 1-based index from `preset list` or an exact preset name
/// to a position in `store.presets()`.
pub fn resolve_preset(store: &WorkoutStore, sel: &str) -> Option<usize> {
    if let Ok(idx) = sel.parse::<usize>() {
        return idx.checked_sub(1).filter(|&i| i < store.presets().len());
    }
    store.presets().iter().position(|p| p.name == sel)
}

/// Surfaces a swallowed write failure without failing the command.
pub fn report_persist_error(store: &mut WorkoutStore) {
    if let Some(e) = store.take_persist_error() {
        eprintln!(
            "{} changes are kept for this run but could not be saved: {}",
            "warning:".yellow().bold(),
            e
        );
    }
}
