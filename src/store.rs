//! The workout store: in-memory owner of presets, history and the active
//! session, writing through to a [`WorkoutBackend`].

use std::path::Path;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    backend::{self, BackendKind, KeyValueFile, WorkoutBackend},
    error::{StoreError, StoreResult},
    migration,
    models::{CompletedWorkout, WorkoutPreset},
};

/// The in-progress session. Never persisted.
#[derive(Debug, Clone)]
struct ActiveWorkout {
    workout: WorkoutPreset,
    started_at: DateTime<Utc>,
}

/// Owns the two persisted collections and the single active workout.
///
/// In-memory state is authoritative. Each mutation of a collection rewrites
/// that whole collection through the backend; a failed write is logged and
/// kept for [`WorkoutStore::take_persist_error`] but never undoes the
/// in-memory change. Only a collection whose last write failed is written
/// again on [`WorkoutStore::close`].
pub struct WorkoutStore {
    backend: Box<dyn WorkoutBackend>,
    presets: Vec<WorkoutPreset>,
    completed_workouts: Vec<CompletedWorkout>,
    current: Option<ActiveWorkout>,
    persist_error: Option<StoreError>,
    presets_dirty: bool,
    history_dirty: bool,
}

impl WorkoutStore {
    /// Opens storage under `data_dir`, imports legacy data when running on
    /// the structured backend, and loads both collections.
    ///
    /// Fails only when no backend can be initialised at all.
    pub async fn open(data_dir: &Path, kind: BackendKind) -> StoreResult<Self> {
        let backend = backend::open_backend(kind, data_dir).await?;

        if backend.kind() == BackendKind::Structured {
            match KeyValueFile::open(backend::flat_path(data_dir)) {
                Ok(legacy) => {
                    if let Err(e) = migration::migrate_legacy(&legacy, backend.as_ref()).await {
                        tracing::warn!(error = %e, "legacy migration failed; will retry on next start");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "cannot read legacy data; skipping migration until next start"),
            }
        }

        Ok(Self::load(backend).await)
    }

    /// Loads both collections from `backend`. Anything that fails to load
    /// starts out empty.
    pub async fn load(backend: Box<dyn WorkoutBackend>) -> Self {
        let presets = backend.load_presets().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load presets; starting empty");
            Vec::new()
        });
        let completed_workouts = backend.load_history().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load workout history; starting empty");
            Vec::new()
        });

        tracing::debug!(
            backend = %backend.kind(),
            presets = presets.len(),
            completed_workouts = completed_workouts.len(),
            "store loaded"
        );

        Self {
            backend,
            presets,
            completed_workouts,
            current: None,
            persist_error: None,
            presets_dirty: false,
            history_dirty: false,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Presets in insertion order.
    pub fn presets(&self) -> &[WorkoutPreset] {
        &self.presets
    }

    /// Completed workouts in completion order, oldest first.
    pub fn history(&self) -> &[CompletedWorkout] {
        &self.completed_workouts
    }

    pub fn preset(&self, id: Uuid) -> Option<&WorkoutPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Appends `preset`, even when its id is already present.
    pub async fn add_preset(&mut self, preset: WorkoutPreset) {
        self.presets.push(preset);
        self.persist_presets().await;
    }

    /// Replaces the first preset with the same id, keeping its position.
    /// Returns `false`, and changes nothing, when the id is unknown.
    pub async fn update_preset(&mut self, preset: WorkoutPreset) -> bool {
        let Some(existing) = self.presets.iter_mut().find(|p| p.id == preset.id) else {
            return false;
        };
        *existing = preset;
        self.persist_presets().await;
        true
    }

    /// Removes every preset with this id and returns how many went.
    /// Completed workouts referencing it are untouched.
    pub async fn delete_preset(&mut self, id: Uuid) -> usize {
        let before = self.presets.len();
        self.presets.retain(|p| p.id != id);
        let removed = before - self.presets.len();
        self.persist_presets().await;
        removed
    }

    /// Makes a copy of `preset` the active workout, discarding any
    /// previous active workout and its edits.
    pub fn start_workout(&mut self, preset: &WorkoutPreset) {
        if let Some(previous) = &self.current {
            tracing::debug!(preset = %previous.workout.name, "discarding active workout");
        }
        self.current = Some(ActiveWorkout {
            workout: preset.clone(),
            started_at: Utc::now(),
        });
    }

    pub fn current_workout(&self) -> Option<&WorkoutPreset> {
        self.current.as_ref().map(|a| &a.workout)
    }

    /// Working copy the caller fills with actual reps and weight.
    pub fn current_workout_mut(&mut self) -> Option<&mut WorkoutPreset> {
        self.current.as_mut().map(|a| &mut a.workout)
    }

    pub fn current_started_at(&self) -> Option<DateTime<Utc>> {
        self.current.as_ref().map(|a| a.started_at)
    }

    /// Appends `completed` to history and clears the active workout.
    pub async fn complete_workout(&mut self, completed: CompletedWorkout) {
        self.completed_workouts.push(completed);
        self.current = None;
        self.persist_history().await;
    }

    /// Completes the active workout as performed so far, timing it from
    /// when it was started. `None` when there is no active workout.
    pub async fn finish_current_workout(&mut self) -> Option<&CompletedWorkout> {
        let active = self.current.take()?;
        let elapsed = (Utc::now() - active.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        let completed =
            CompletedWorkout::from_preset(&active.workout, active.workout.exercises.clone(), Some(elapsed));

        self.complete_workout(completed).await;
        self.completed_workouts.last()
    }

    /// Drops the active workout. Nothing is written.
    pub fn cancel_current_workout(&mut self) {
        self.current = None;
    }

    /// The most recent write failure since the last call, if any.
    pub fn take_persist_error(&mut self) -> Option<StoreError> {
        self.persist_error.take()
    }

    /// Retries any collection whose last write failed, then releases the
    /// backend. A collection that only failed to load is never written.
    pub async fn close(mut self) -> StoreResult<()> {
        if self.presets_dirty {
            self.persist_presets().await;
        }
        if self.history_dirty {
            self.persist_history().await;
        }
        self.backend.close().await;

        match self.persist_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn persist_presets(&mut self) {
        match self.backend.save_presets(&self.presets).await {
            Ok(()) => self.presets_dirty = false,
            Err(e) => {
                tracing::warn!(error = %e, backend = %self.backend.kind(), "failed to save presets");
                self.presets_dirty = true;
                self.persist_error = Some(e);
            }
        }
    }

    async fn persist_history(&mut self) {
        match self.backend.save_history(&self.completed_workouts).await {
            Ok(()) => self.history_dirty = false,
            Err(e) => {
                tracing::warn!(error = %e, backend = %self.backend.kind(), "failed to save workout history");
                self.history_dirty = true;
                self.persist_error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        backend::{MemoryBackend, PRESETS_KEY, SqliteBackend},
        models::{Exercise, WorkoutSet},
    };

    fn push_day() -> WorkoutPreset {
        WorkoutPreset::new(
            "Push Day",
            vec![Exercise::new(
                "Bench Press",
                vec![WorkoutSet::new("8-10").with_weight(135.0)],
            )],
            "",
        )
    }

    fn named(name: &str) -> WorkoutPreset {
        WorkoutPreset::new(name, vec![Exercise::new("Row", vec![WorkoutSet::new("10")])], "")
    }

    /// Shares one in-memory backend between store instances.
    struct SharedBackend(Arc<MemoryBackend>);

    #[async_trait]
    impl WorkoutBackend for SharedBackend {
        fn kind(&self) -> BackendKind {
            self.0.kind()
        }
        async fn load_presets(&self) -> StoreResult<Vec<WorkoutPreset>> {
            self.0.load_presets().await
        }
        async fn save_presets(&self, presets: &[WorkoutPreset]) -> StoreResult<()> {
            self.0.save_presets(presets).await
        }
        async fn load_history(&self) -> StoreResult<Vec<CompletedWorkout>> {
            self.0.load_history().await
        }
        async fn save_history(&self, workouts: &[CompletedWorkout]) -> StoreResult<()> {
            self.0.save_history(workouts).await
        }
    }

    /// Loads nothing and rejects every write.
    struct BrokenBackend;

    #[async_trait]
    impl WorkoutBackend for BrokenBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Flat
        }
        async fn load_presets(&self) -> StoreResult<Vec<WorkoutPreset>> {
            Err(StoreError::corrupt("preset", "unreadable"))
        }
        async fn save_presets(&self, _: &[WorkoutPreset]) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
        async fn load_history(&self) -> StoreResult<Vec<CompletedWorkout>> {
            Err(StoreError::corrupt("completed workout", "unreadable"))
        }
        async fn save_history(&self, _: &[CompletedWorkout]) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    /// Rejects preset writes while `fail` is set.
    struct FlakyBackend {
        inner: Arc<MemoryBackend>,
        fail: Arc<AtomicBool>,
    }

    #[async_trait]
    impl WorkoutBackend for FlakyBackend {
        fn kind(&self) -> BackendKind {
            self.inner.kind()
        }
        async fn load_presets(&self) -> StoreResult<Vec<WorkoutPreset>> {
            self.inner.load_presets().await
        }
        async fn save_presets(&self, presets: &[WorkoutPreset]) -> StoreResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save_presets(presets).await
        }
        async fn load_history(&self) -> StoreResult<Vec<CompletedWorkout>> {
            self.inner.load_history().await
        }
        async fn save_history(&self, workouts: &[CompletedWorkout]) -> StoreResult<()> {
            self.inner.save_history(workouts).await
        }
    }

    async fn replay(store: &mut WorkoutStore) {
        let a = named("A");
        let b = named("B");
        let c = named("C");

        store.add_preset(a.clone()).await;
        store.add_preset(b.clone()).await;
        store.add_preset(a.clone()).await;
        store.add_preset(c.clone()).await;

        let mut b2 = b.clone();
        b2.name = "B renamed".into();
        b2.exercises.push(Exercise::new("Curl", vec![WorkoutSet::new("12-15")]));
        assert!(store.update_preset(b2).await);
        assert!(!store.update_preset(named("ghost")).await);

        assert_eq!(store.delete_preset(c.id).await, 1);
        assert_eq!(store.delete_preset(c.id).await, 0);

        let mut a2 = a.clone();
        a2.notes = "only the first copy changes".into();
        assert!(store.update_preset(a2).await);
    }

    #[tokio::test]
    async fn test_replay_matches_reload_on_every_backend() {
        for kind in [BackendKind::Structured, BackendKind::Flat] {
            let dir = tempfile::tempdir().unwrap();
            let mut store = WorkoutStore::open(dir.path(), kind).await.unwrap();
            assert_eq!(store.backend_kind(), kind);

            replay(&mut store).await;
            assert!(store.take_persist_error().is_none());
            let in_memory = store.presets().to_vec();
            store.close().await.unwrap();

            let reloaded = WorkoutStore::open(dir.path(), kind).await.unwrap();
            assert_eq!(reloaded.presets(), in_memory.as_slice(), "backend {kind}");

            let names: Vec<&str> = in_memory.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, ["A", "B renamed", "A"]);
            assert_eq!(in_memory[0].notes, "only the first copy changes");
            assert_eq!(in_memory[2].notes, "");
        }
    }

    #[tokio::test]
    async fn test_update_unknown_id_does_not_insert() {
        let mut store = WorkoutStore::load(Box::new(MemoryBackend::new())).await;
        store.add_preset(push_day()).await;
        let before = store.presets().to_vec();

        assert!(!store.update_preset(named("Never added")).await);
        assert_eq!(store.presets(), before.as_slice());
    }

    #[tokio::test]
    async fn test_delete_twice_is_noop() {
        let mut store = WorkoutStore::load(Box::new(MemoryBackend::new())).await;
        let preset = push_day();
        store.add_preset(preset.clone()).await;
        store.add_preset(named("Legs")).await;

        assert_eq!(store.delete_preset(preset.id).await, 1);
        assert_eq!(store.delete_preset(preset.id).await, 0);
        assert_eq!(store.presets().len(), 1);
        assert!(store.preset(preset.id).is_none());
    }

    #[tokio::test]
    async fn test_second_start_discards_first_session() {
        let mut store = WorkoutStore::load(Box::new(MemoryBackend::new())).await;
        let push = push_day();
        let legs = named("Legs");

        store.start_workout(&push);
        store.current_workout_mut().unwrap().exercises[0].sets[0].actual_reps = Some(10);
        store.start_workout(&legs);

        let current = store.current_workout().unwrap();
        assert_eq!(current.id, legs.id);
        assert!(current.exercises[0].sets[0].actual_reps.is_none());

        // Restarting the first preset starts from the stored plan, not the old edits.
        store.start_workout(&push);
        assert!(store.current_workout().unwrap().exercises[0].sets[0].actual_reps.is_none());
    }

    #[tokio::test]
    async fn test_complete_captures_preset_at_start() {
        let shared = Arc::new(MemoryBackend::new());
        let mut store = WorkoutStore::load(Box::new(SharedBackend(shared.clone()))).await;
        let mut preset = push_day();
        preset.notes = "Focus on form".into();
        store.add_preset(preset.clone()).await;

        store.start_workout(&preset);
        let snapshot = store.current_workout().unwrap().clone();

        let mut edited = preset.clone();
        edited.name = "Chest Day".into();
        edited.notes = "changed".into();
        store.update_preset(edited).await;

        store
            .complete_workout(CompletedWorkout::from_preset(&snapshot, snapshot.exercises.clone(), None))
            .await;

        assert!(store.current_workout().is_none());
        assert_eq!(store.history().len(), 1);
        let done = &store.history()[0];
        assert_eq!(done.preset_id, preset.id);
        assert_eq!(done.preset_name, "Push Day");
        assert_eq!(done.notes, "Focus on form");
        assert_eq!(shared.load_history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_writes_nothing() {
        let shared = Arc::new(MemoryBackend::new());
        let mut store = WorkoutStore::load(Box::new(SharedBackend(shared.clone()))).await;

        store.start_workout(&push_day());
        store.cancel_current_workout();

        assert!(store.current_workout().is_none());
        assert!(store.current_started_at().is_none());
        assert!(store.history().is_empty());
        assert!(shared.load_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_preset_keeps_history() {
        let mut store = WorkoutStore::load(Box::new(MemoryBackend::new())).await;
        let preset = push_day();
        store.add_preset(preset.clone()).await;
        store.start_workout(&preset);
        store.finish_current_workout().await.unwrap();

        store.delete_preset(preset.id).await;

        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history()[0].preset_id, preset.id);
        assert!(store.preset(store.history()[0].preset_id).is_none());
    }

    #[tokio::test]
    async fn test_finish_without_active_workout() {
        let mut store = WorkoutStore::load(Box::new(MemoryBackend::new())).await;
        assert!(store.finish_current_workout().await.is_none());
        assert!(store.history().is_empty());
    }

    #[tokio::test]
    async fn test_finish_records_elapsed_duration() {
        let mut store = WorkoutStore::load(Box::new(MemoryBackend::new())).await;
        store.start_workout(&push_day());
        let started = store.current_started_at().unwrap();

        let done = store.finish_current_workout().await.unwrap().clone();
        let duration = done.duration.unwrap();
        assert!(duration >= 0.0);
        assert!(done.date_completed >= started);
        assert!(store.current_workout().is_none());
    }

    #[tokio::test]
    async fn test_write_failures_are_swallowed() {
        let mut store = WorkoutStore::load(Box::new(BrokenBackend)).await;
        assert!(store.presets().is_empty());
        assert!(store.history().is_empty());

        let preset = push_day();
        store.add_preset(preset.clone()).await;
        assert_eq!(store.presets(), &[preset.clone()]);
        assert!(matches!(store.take_persist_error(), Some(StoreError::Io(_))));
        assert!(store.take_persist_error().is_none());

        store.start_workout(&preset);
        store.finish_current_workout().await.unwrap();
        assert_eq!(store.history().len(), 1);
        assert!(store.take_persist_error().is_some());

        assert!(store.close().await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_flat_data_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KeyValueFile::open(backend::flat_path(dir.path())).unwrap();
        kv.set(PRESETS_KEY, &serde_json::json!({ "not": "a list" })).unwrap();

        let store = WorkoutStore::open(dir.path(), BackendKind::Flat).await.unwrap();
        assert!(store.presets().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_session_keeps_unloadable_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = WorkoutStore::open(dir.path(), BackendKind::Structured).await.unwrap();
        for name in ["A", "B", "C"] {
            store.add_preset(named(name)).await;
        }
        store.close().await.unwrap();

        let db = SqliteBackend::open(&backend::db_path(dir.path())).await.unwrap();
        sqlx::query("UPDATE workout_sets SET actual_reps = -1 WHERE row_id = (SELECT min(row_id) FROM workout_sets)")
            .execute(db.pool())
            .await
            .unwrap();

        let store = WorkoutStore::open(dir.path(), BackendKind::Structured).await.unwrap();
        assert!(store.presets().is_empty());
        store.close().await.unwrap();

        let rows: i64 = sqlx::query_scalar("SELECT count(*) FROM workout_presets")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 3);
    }

    #[tokio::test]
    async fn test_unparseable_legacy_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = backend::flat_path(dir.path());
        let truncated = "{ \"workout_presets\": [ truncated";
        std::fs::write(&path, truncated).unwrap();

        let store = WorkoutStore::open(dir.path(), BackendKind::Structured).await.unwrap();
        assert_eq!(store.backend_kind(), BackendKind::Structured);
        assert!(store.presets().is_empty());
        store.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), truncated);
    }

    #[tokio::test]
    async fn test_flat_read_only_session_keeps_unparseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = backend::flat_path(dir.path());
        let truncated = "{ \"workout_presets\": [ truncated";
        std::fs::write(&path, truncated).unwrap();

        let store = WorkoutStore::open(dir.path(), BackendKind::Flat).await.unwrap();
        assert!(store.presets().is_empty());
        store.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), truncated);
    }

    #[tokio::test]
    async fn test_close_retries_failed_write() {
        let shared = Arc::new(MemoryBackend::new());
        let fail = Arc::new(AtomicBool::new(true));
        let flaky = FlakyBackend {
            inner: shared.clone(),
            fail: fail.clone(),
        };
        let mut store = WorkoutStore::load(Box::new(flaky)).await;

        let preset = push_day();
        store.add_preset(preset.clone()).await;
        assert!(store.take_persist_error().is_some());
        assert!(shared.load_presets().await.unwrap().is_empty());

        fail.store(false, Ordering::SeqCst);
        store.close().await.unwrap();
        assert_eq!(shared.load_presets().await.unwrap(), vec![preset]);
    }

    #[tokio::test]
    async fn test_open_structured_imports_legacy_once() {
        let dir = tempfile::tempdir().unwrap();
        let preset = push_day();
        let kv = KeyValueFile::open(backend::flat_path(dir.path())).unwrap();
        kv.set(PRESETS_KEY, &vec![preset.clone()]).unwrap();
        drop(kv);

        let store = WorkoutStore::open(dir.path(), BackendKind::Structured).await.unwrap();
        assert_eq!(store.presets(), &[preset.clone()]);
        store.close().await.unwrap();

        let store = WorkoutStore::open(dir.path(), BackendKind::Structured).await.unwrap();
        assert_eq!(store.presets(), &[preset]);
    }

    #[tokio::test]
    async fn test_push_day_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let preset = push_day();

        let mut store = WorkoutStore::open(dir.path(), BackendKind::Structured).await.unwrap();
        store.add_preset(preset.clone()).await;
        store.close().await.unwrap();

        let store = WorkoutStore::open(dir.path(), BackendKind::Structured).await.unwrap();
        let loaded = &store.presets()[0];
        assert_eq!(loaded, &preset);
        assert_eq!(loaded.exercises[0].sets[0].target_reps, "8-10");
        assert_eq!(loaded.exercises[0].sets[0].weight, Some(135.0));
        assert_eq!(loaded.exercises[0].sets[0].actual_reps, None);
    }

    #[tokio::test]
    async fn test_end_to_end_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = WorkoutStore::open(dir.path(), BackendKind::Structured).await.unwrap();
        let preset = push_day();
        store.add_preset(preset.clone()).await;

        store.start_workout(&preset);
        let current = store.current_workout_mut().unwrap();
        current.exercises[0].sets[0].actual_reps = Some(10);
        current.exercises[0].sets[0].weight = Some(135.0);
        let performed = current.clone();

        store
            .complete_workout(CompletedWorkout::from_preset(&performed, performed.exercises.clone(), Some(2400.0)))
            .await;
        store.close().await.unwrap();

        let store = WorkoutStore::open(dir.path(), BackendKind::Structured).await.unwrap();
        let history = store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].preset_name, "Push Day");
        assert_eq!(history[0].exercises.len(), 1);
        assert_eq!(history[0].exercises[0].sets.len(), 1);
        assert_eq!(history[0].exercises[0].sets[0].actual_reps, Some(10));
        assert_eq!(history[0].duration, Some(2400.0));

        // The preset plan itself is unchanged by the session.
        assert_eq!(store.presets()[0].exercises[0].sets[0].actual_reps, None);
    }
}
