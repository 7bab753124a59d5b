//! Persistence for workout presets, completed workouts and the active
//! session, over either a flat key-value file or a SQLite database.

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod migration;
pub mod models;
pub mod output;
pub mod store;
pub mod utils;

pub use error::{StoreError, StoreResult};
pub use store::WorkoutStore;
