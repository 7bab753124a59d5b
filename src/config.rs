use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Keys accepted by `config set`.
pub const KEYS: [&str; 3] = ["data_dir", "backend", "log"];

/// Settings read from `config.toml`. Every key is optional on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl Config {
    /// `<config dir>/pumppad/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join("pumppad").join("config.toml"))
            .context("Could not determine config directory")
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config: {}", path.display()));
            }
        };

        toml::from_str(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to save config to {}", path.display()))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("pumppad"))
                .context("Could not determine data directory"),
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend.unwrap_or_default()
    }

    pub fn log_filter(&self) -> &str {
        self.log.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Explicitly set keys and their values, in `KEYS` order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        KEYS.iter().filter_map(|&k| self.get(k).map(|v| (k, v))).collect()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "data_dir" => self.data_dir.as_ref().map(|d| d.display().to_string()),
            "backend" => self.backend.map(|b| b.to_string()),
            "log" => self.log.clone(),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, val: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = Some(PathBuf::from(val)),
            "backend" => {
                let kind = match val {
                    "flat" => BackendKind::Flat,
                    "structured" => BackendKind::Structured,
                    other => bail!("unknown backend `{other}` (expected `flat` or `structured`)"),
                };
                self.backend = Some(kind);
            }
            "log" => {
                tracing_subscriber::EnvFilter::try_new(val)
                    .with_context(|| format!("invalid log filter `{val}`"))?;
                self.log = Some(val.to_string());
            }
            other => bail!("unknown config key `{other}` (known keys: {})", KEYS.join(", ")),
        }
        Ok(())
    }

    /// Clears `key`; returns whether it was set.
    pub fn unset(&mut self, key: &str) -> bool {
        match key {
            "data_dir" => self.data_dir.take().is_some(),
            "backend" => self.backend.take().is_some(),
            "log" => self.log.take().is_some(),
            _ => false,
        }
    }
}
