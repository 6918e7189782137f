//! TOML-based engine settings.
//!
//! Stored at `~/.config/saunaflow/settings.toml`. Every field has a serde
//! default, so a partial or empty file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::StorageError;

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Period of the background ticker.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How late a tick may observe a scheduled start and still fire it.
    #[serde(default = "default_schedule_grace_secs")]
    pub schedule_grace_secs: u64,
    /// Snap session config updates into the supported ranges.
    #[serde(default = "default_true")]
    pub clamp_session_config: bool,
}

fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_schedule_grace_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            schedule_grace_secs: default_schedule_grace_secs(),
            clamp_session_config: true,
        }
    }
}

impl EngineSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn schedule_grace_ms(&self) -> i64 {
        i64::try_from(self.schedule_grace_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }

    fn path() -> Result<PathBuf, StorageError> {
        Ok(data_dir()?.join(SETTINGS_FILE))
    }

    /// Load from `path`, or return defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, StorageError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(StorageError::io(path, err)),
        }
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), StorageError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| StorageError::io(path, e))
    }

    /// Load from the data directory, returning defaults on any error.
    pub fn load_or_default() -> Self {
        match Self::path().and_then(|p| Self::load_from(&p)) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(error = %err, "using default engine settings");
                Self::default()
            }
        }
    }
}
