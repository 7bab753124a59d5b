use std::path::Path;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::error::StoreResult;

pub type DB = SqlitePool;

/// Structured layout. Every child row points at its owner and carries an
/// explicit `order_index`; top-level rows carry `position`. Entity ids live
/// in `id` columns and are not unique on purpose, since exercise and set ids
/// are shared between a preset and the workouts completed from it.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS workout_presets (
    row_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    id           TEXT    NOT NULL,
    position     INTEGER NOT NULL,
    name         TEXT    NOT NULL,
    notes        TEXT    NOT NULL DEFAULT '',
    date_created TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS completed_workouts (
    row_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    id             TEXT    NOT NULL,
    position       INTEGER NOT NULL,
    preset_id      TEXT    NOT NULL,
    preset_name    TEXT    NOT NULL,
    notes          TEXT    NOT NULL DEFAULT '',
    date_completed TEXT    NOT NULL,
    duration       REAL
);

CREATE TABLE IF NOT EXISTS exercises (
    row_id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    id                       TEXT    NOT NULL,
    preset_row_id            INTEGER REFERENCES workout_presets(row_id) ON DELETE CASCADE,
    completed_workout_row_id INTEGER REFERENCES completed_workouts(row_id) ON DELETE CASCADE,
    order_index              INTEGER NOT NULL,
    name                     TEXT    NOT NULL,
    CHECK ((preset_row_id IS NULL) <> (completed_workout_row_id IS NULL))
);

CREATE TABLE IF NOT EXISTS workout_sets (
    row_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    id              TEXT    NOT NULL,
    exercise_row_id INTEGER NOT NULL REFERENCES exercises(row_id) ON DELETE CASCADE,
    order_index     INTEGER NOT NULL,
    target_reps     TEXT    NOT NULL,
    actual_reps     INTEGER,
    weight          REAL
);

CREATE INDEX IF NOT EXISTS idx_exercises_preset ON exercises(preset_row_id, order_index);
CREATE INDEX IF NOT EXISTS idx_exercises_completed ON exercises(completed_workout_row_id, order_index);
CREATE INDEX IF NOT EXISTS idx_sets_exercise ON workout_sets(exercise_row_id, order_index);
"#;

pub async fn open(path: &Path) -> StoreResult<DB> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;

    sqlx::raw_sql(SCHEMA).execute(&pool).await?;
    Ok(pool)
}
