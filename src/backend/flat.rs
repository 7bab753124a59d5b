use std::{
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{BackendKind, WorkoutBackend};
use crate::{
    error::{StoreError, StoreResult},
    models::{CompletedWorkout, WorkoutPreset},
};

pub const PRESETS_KEY: &str = "workout_presets";
pub const COMPLETED_WORKOUTS_KEY: &str = "completed_workouts";

/// A JSON object on disk used as a small key-value store.
///
/// Every mutation rewrites the whole file through a temp file and a rename,
/// so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct KeyValueFile {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl KeyValueFile {
    /// Opens `path`, creating its directory if needed. A missing file starts
    /// out empty; a file that is not a JSON object is a `Corrupt` error.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = read_entries(&path)?;
        Ok(Self::with_entries(path, entries))
    }

    /// Like [`KeyValueFile::open`], but an unparseable file opens empty.
    /// The file on disk is left alone until the next write.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(e @ StoreError::Corrupt { .. }) => {
                tracing::warn!(error = %e, "ignoring unreadable key-value file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        Ok(Self::with_entries(path, entries))
    }

    fn with_entries(path: PathBuf, entries: BTreeMap<String, Value>) -> Self {
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Decodes the value under `key`; `Ok(None)` when absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let value = self.lock().get(key).cloned();
        match value {
            Some(Value::Null) | None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.lock().get(key), Some(Value::Bool(true)))
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let value = serde_json::to_value(value)?;
        let mut entries = self.lock();
        entries.insert(key.to_string(), value);
        self.write(&entries)
    }

    pub fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, entries: &BTreeMap<String, Value>) -> StoreResult<()> {
        let temp_path = self.path.with_extension("tmp");
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, entries)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        match fs::rename(&temp_path, &self.path) {
            Ok(()) => Ok(()),
            Err(_) if self.path.exists() => {
                let _ = fs::remove_file(&self.path);
                Ok(fs::rename(&temp_path, &self.path)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn read_entries(path: &Path) -> StoreResult<BTreeMap<String, Value>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
        Ok(contents) => serde_json::from_str(&contents)
            .map_err(|e| StoreError::corrupt("key-value file", format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// Legacy-generation backend: each collection is one JSON blob under its key.
#[derive(Debug)]
pub struct FlatBackend {
    file: KeyValueFile,
}

impl FlatBackend {
    pub fn new(file: KeyValueFile) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &KeyValueFile {
        &self.file
    }
}

#[async_trait]
impl WorkoutBackend for FlatBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Flat
    }

    async fn load_presets(&self) -> StoreResult<Vec<WorkoutPreset>> {
        Ok(self.file.get(PRESETS_KEY)?.unwrap_or_default())
    }

    async fn save_presets(&self, presets: &[WorkoutPreset]) -> StoreResult<()> {
        self.file.set(PRESETS_KEY, presets)
    }

    async fn load_history(&self) -> StoreResult<Vec<CompletedWorkout>> {
        Ok(self.file.get(COMPLETED_WORKOUTS_KEY)?.unwrap_or_default())
    }

    async fn save_history(&self, workouts: &[CompletedWorkout]) -> StoreResult<()> {
        self.file.set(COMPLETED_WORKOUTS_KEY, workouts)
    }
}
