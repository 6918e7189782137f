//! Settings for a program-less ("simple") session.

use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::{load_json, save_json, KeyValueStore};

/// Store key holding the serialized [`SessionConfig`].
pub const SESSION_CONFIG_KEY: &str = "session_config";

pub const DURATION_RANGE: RangeInclusive<u32> = 5..=60;
pub const HEAT_RANGE: RangeInclusive<u32> = 60..=100;
pub const HUMIDITY_RANGE: RangeInclusive<u32> = 10..=80;
/// All three settings move in steps of five.
pub const STEP: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default = "default_heat")]
    pub heat_celsius: u32,
    #[serde(default = "default_humidity")]
    pub humidity_percent: u32,
}

fn default_duration() -> u32 {
    15
}
fn default_heat() -> u32 {
    80
}
fn default_humidity() -> u32 {
    20
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: default_duration(),
            heat_celsius: default_heat(),
            humidity_percent: default_humidity(),
        }
    }
}

impl SessionConfig {
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    /// Snap every field into its supported range and onto the step grid.
    pub fn clamped(self) -> Self {
        Self {
            duration_minutes: snap(self.duration_minutes, &DURATION_RANGE),
            heat_celsius: snap(self.heat_celsius, &HEAT_RANGE),
            humidity_percent: snap(self.humidity_percent, &HUMIDITY_RANGE),
        }
    }

    pub fn apply(&mut self, patch: SessionConfigPatch) {
        if let Some(v) = patch.duration_minutes {
            self.duration_minutes = v;
        }
        if let Some(v) = patch.heat_celsius {
            self.heat_celsius = v;
        }
        if let Some(v) = patch.humidity_percent {
            self.humidity_percent = v;
        }
    }
}

/// Round to the nearest step, then clamp.
fn snap(value: u32, range: &RangeInclusive<u32>) -> u32 {
    let rounded = value.saturating_add(STEP / 2) / STEP * STEP;
    rounded.clamp(*range.start(), *range.end())
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfigPatch {
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub heat_celsius: Option<u32>,
    #[serde(default)]
    pub humidity_percent: Option<u32>,
}

impl SessionConfigPatch {
    pub fn duration(minutes: u32) -> Self {
        Self {
            duration_minutes: Some(minutes),
            ..Self::default()
        }
    }
}

/// Persisted holder of the current [`SessionConfig`].
pub struct SessionConfigStore {
    store: Arc<dyn KeyValueStore>,
    current: SessionConfig,
    clamp: bool,
}

impl SessionConfigStore {
    /// Restore from `store`, falling back to defaults when nothing usable is stored.
    pub fn load(store: Arc<dyn KeyValueStore>, clamp: bool) -> Self {
        let current = load_json(store.as_ref(), SESSION_CONFIG_KEY).unwrap_or_default();
        Self {
            store,
            current,
            clamp,
        }
    }

    pub fn get(&self) -> SessionConfig {
        self.current
    }

    /// Apply `patch` and persist. The in-memory value is updated even if the
    /// write fails.
    ///
    /// # Errors
    /// Returns an error if the config could not be saved.
    pub fn set(&mut self, patch: SessionConfigPatch) -> Result<SessionConfig, StorageError> {
        let mut next = self.current;
        next.apply(patch);
        if self.clamp {
            next = next.clamped();
        }
        self.current = next;
        save_json(self.store.as_ref(), SESSION_CONFIG_KEY, &self.current)?;
        Ok(self.current)
    }
}

impl std::fmt::Debug for SessionConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfigStore")
            .field("current", &self.current)
            .field("clamp", &self.clamp)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn clamped_snaps_to_range_and_grid() {
        let raw = SessionConfig {
            duration_minutes: 2,
            heat_celsius: 83,
            humidity_percent: 95,
        };
        assert_eq!(
            raw.clamped(),
            SessionConfig {
                duration_minutes: 5,
                heat_celsius: 85,
                humidity_percent: 80,
            }
        );
        assert_eq!(SessionConfig::default().clamped(), SessionConfig::default());
    }

    #[test]
    fn set_persists_and_restores() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut configs = SessionConfigStore::load(store.clone(), true);
        assert_eq!(configs.get(), SessionConfig::default());

        configs
            .set(SessionConfigPatch {
                heat_celsius: Some(90),
                ..SessionConfigPatch::duration(30)
            })
            .unwrap();

        let restored = SessionConfigStore::load(store, true);
        assert_eq!(restored.get().duration_minutes, 30);
        assert_eq!(restored.get().heat_celsius, 90);
        assert_eq!(restored.get().humidity_percent, 20);
    }

    #[test]
    fn unclamped_store_trusts_caller() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut configs = SessionConfigStore::load(store, false);
        let cfg = configs.set(SessionConfigPatch::duration(1)).unwrap();
        assert_eq!(cfg.duration_minutes, 1);
    }

    #[test]
    fn corrupt_config_falls_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_CONFIG_KEY, "not json").unwrap();
        let configs = SessionConfigStore::load(store, true);
        assert_eq!(configs.get(), SessionConfig::default());
    }

    #[test]
    fn partial_stored_config_fills_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_CONFIG_KEY, r#"{"duration_minutes":45}"#).unwrap();
        let configs = SessionConfigStore::load(store, true);
        assert_eq!(configs.get().duration_minutes, 45);
        assert_eq!(configs.get().heat_celsius, 80);
    }
}
