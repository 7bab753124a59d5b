use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, sqlite::SqliteRow};
use uuid::Uuid;

use super::{BackendKind, WorkoutBackend};
use crate::{
    db::{self, DB},
    error::{StoreError, StoreResult},
    models::{CompletedWorkout, Exercise, WorkoutPreset, WorkoutSet},
};

/// Structured-generation backend on SQLite.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: DB,
}

/// Which parent table an exercise row hangs off.
#[derive(Debug, Clone, Copy)]
enum Owner {
    Preset,
    CompletedWorkout,
}

impl Owner {
    fn column(self) -> &'static str {
        match self {
            Self::Preset => "preset_row_id",
            Self::CompletedWorkout => "completed_workout_row_id",
        }
    }
}

impl SqliteBackend {
    pub async fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::from_pool(db::open(path).await?))
    }

    pub fn from_pool(pool: DB) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DB {
        &self.pool
    }

    /// Loads every exercise owned by `owner` rows, grouped by owner row id,
    /// each group in `order_index` order with its sets attached.
    async fn load_exercises(&self, owner: Owner) -> StoreResult<HashMap<i64, Vec<Exercise>>> {
        let col = owner.column();

        let set_rows = sqlx::query(&format!(
            r#"
            SELECT s.exercise_row_id, s.id, s.target_reps, s.actual_reps, s.weight
            FROM   workout_sets s
            JOIN   exercises e ON e.row_id = s.exercise_row_id
            WHERE  e.{col} IS NOT NULL
            ORDER  BY s.exercise_row_id, s.order_index
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut sets: HashMap<i64, Vec<WorkoutSet>> = HashMap::new();
        for row in set_rows {
            let exercise_row: i64 = row.try_get("exercise_row_id")?;
            sets.entry(exercise_row).or_default().push(set_from_row(&row)?);
        }

        let exercise_rows = sqlx::query(&format!(
            r#"
            SELECT row_id, {col} AS owner_row_id, id, name
            FROM   exercises
            WHERE  {col} IS NOT NULL
            ORDER  BY {col}, order_index
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut exercises: HashMap<i64, Vec<Exercise>> = HashMap::new();
        for row in exercise_rows {
            let row_id: i64 = row.try_get("row_id")?;
            let owner_row: i64 = row.try_get("owner_row_id")?;
            exercises.entry(owner_row).or_default().push(Exercise {
                id: parse_uuid("exercise", &row.try_get::<String, _>("id")?)?,
                name: row.try_get("name")?,
                sets: sets.remove(&row_id).unwrap_or_default(),
            });
        }

        Ok(exercises)
    }
}

#[async_trait]
impl WorkoutBackend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Structured
    }

    async fn load_presets(&self) -> StoreResult<Vec<WorkoutPreset>> {
        let mut exercises = self.load_exercises(Owner::Preset).await?;

        let rows = sqlx::query(
            r#"
            SELECT row_id, id, name, notes, date_created
            FROM   workout_presets
            ORDER  BY position, row_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<WorkoutPreset> {
                let row_id: i64 = row.try_get("row_id")?;
                Ok(WorkoutPreset {
                    id: parse_uuid("preset", &row.try_get::<String, _>("id")?)?,
                    name: row.try_get("name")?,
                    exercises: exercises.remove(&row_id).unwrap_or_default(),
                    notes: row.try_get("notes")?,
                    date_created: parse_time("preset", &row.try_get::<String, _>("date_created")?)?,
                })
            })
            .collect()
    }

    async fn save_presets(&self, presets: &[WorkoutPreset]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        clear(&mut tx, Owner::Preset, "workout_presets").await?;

        for (position, preset) in presets.iter().enumerate() {
            let row_id = sqlx::query(
                r#"
                INSERT INTO workout_presets (id, position, name, notes, date_created)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(preset.id.to_string())
            .bind(position as i64)
            .bind(&preset.name)
            .bind(&preset.notes)
            .bind(preset.date_created.to_rfc3339())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            insert_exercises(&mut tx, Owner::Preset, row_id, &preset.exercises).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_history(&self) -> StoreResult<Vec<CompletedWorkout>> {
        let mut exercises = self.load_exercises(Owner::CompletedWorkout).await?;

        let rows = sqlx::query(
            r#"
            SELECT row_id, id, preset_id, preset_name, notes, date_completed, duration
            FROM   completed_workouts
            ORDER  BY position, row_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<CompletedWorkout> {
                let row_id: i64 = row.try_get("row_id")?;
                Ok(CompletedWorkout {
                    id: parse_uuid("completed workout", &row.try_get::<String, _>("id")?)?,
                    preset_id: parse_uuid("completed workout", &row.try_get::<String, _>("preset_id")?)?,
                    preset_name: row.try_get("preset_name")?,
                    exercises: exercises.remove(&row_id).unwrap_or_default(),
                    notes: row.try_get("notes")?,
                    date_completed: parse_time(
                        "completed workout",
                        &row.try_get::<String, _>("date_completed")?,
                    )?,
                    duration: row.try_get("duration")?,
                })
            })
            .collect()
    }

    async fn save_history(&self, workouts: &[CompletedWorkout]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        clear(&mut tx, Owner::CompletedWorkout, "completed_workouts").await?;

        for (position, workout) in workouts.iter().enumerate() {
            let row_id = sqlx::query(
                r#"
                INSERT INTO completed_workouts
                    (id, position, preset_id, preset_name, notes, date_completed, duration)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(workout.id.to_string())
            .bind(position as i64)
            .bind(workout.preset_id.to_string())
            .bind(&workout.preset_name)
            .bind(&workout.notes)
            .bind(workout.date_completed.to_rfc3339())
            .bind(workout.duration)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            insert_exercises(&mut tx, Owner::CompletedWorkout, row_id, &workout.exercises).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Removes a whole top-level collection together with its exercises and sets.
async fn clear(conn: &mut SqliteConnection, owner: Owner, table: &str) -> StoreResult<()> {
    let col = owner.column();

    sqlx::query(&format!(
        "DELETE FROM workout_sets WHERE exercise_row_id IN \
         (SELECT row_id FROM exercises WHERE {col} IS NOT NULL)"
    ))
    .execute(&mut *conn)
    .await?;

    sqlx::query(&format!("DELETE FROM exercises WHERE {col} IS NOT NULL"))
        .execute(&mut *conn)
        .await?;

    sqlx::query(&format!("DELETE FROM {table}"))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn insert_exercises(
    conn: &mut SqliteConnection,
    owner: Owner,
    owner_row: i64,
    exercises: &[Exercise],
) -> StoreResult<()> {
    let (preset_row, completed_row) = match owner {
        Owner::Preset => (Some(owner_row), None),
        Owner::CompletedWorkout => (None, Some(owner_row)),
    };

    for (order, exercise) in exercises.iter().enumerate() {
        let exercise_row = sqlx::query(
            r#"
            INSERT INTO exercises (id, preset_row_id, completed_workout_row_id, order_index, name)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(exercise.id.to_string())
        .bind(preset_row)
        .bind(completed_row)
        .bind(order as i64)
        .bind(&exercise.name)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        for (set_order, set) in exercise.sets.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO workout_sets
                    (id, exercise_row_id, order_index, target_reps, actual_reps, weight)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(set.id.to_string())
            .bind(exercise_row)
            .bind(set_order as i64)
            .bind(&set.target_reps)
            .bind(set.actual_reps.map(i64::from))
            .bind(set.weight)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}

fn set_from_row(row: &SqliteRow) -> StoreResult<WorkoutSet> {
    let actual_reps = match row.try_get::<Option<i64>, _>("actual_reps")? {
        Some(reps) => Some(
            u32::try_from(reps)
                .map_err(|_| StoreError::corrupt("set", format!("actual reps out of range: {reps}")))?,
        ),
        None => None,
    };

    Ok(WorkoutSet {
        id: parse_uuid("set", &row.try_get::<String, _>("id")?)?,
        target_reps: row.try_get("target_reps")?,
        actual_reps,
        weight: row.try_get("weight")?,
    })
}

fn parse_uuid(entity: &'static str, raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::corrupt(entity, format!("bad id `{raw}`: {e}")))
}

fn parse_time(entity: &'static str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(entity, format!("bad timestamp `{raw}`: {e}")))
}
