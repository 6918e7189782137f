//! Key-value persistence for session configuration and the program catalog.
//!
//! The engine only needs `get`/`set` over string values. Structured data is
//! stored as JSON; unreadable values are logged and treated as absent so the
//! caller can fall back to defaults.

mod json_file;
mod memory;
mod settings;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use settings::EngineSettings;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// String key-value store backing all persisted engine data.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    /// Returns an error if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value, treating missing or corrupt data as `None`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "discarding unreadable stored value");
            None
        }
    }
}

/// Encode a value as JSON and store it under `key`.
///
/// # Errors
/// Returns an error if serialization or the underlying write fails.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Returns `~/.config/saunaflow[-dev]/` based on SAUNAFLOW_ENV.
///
/// Set SAUNAFLOW_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SAUNAFLOW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("saunaflow-dev")
    } else {
        base_dir.join("saunaflow")
    };

    std::fs::create_dir_all(&dir).map_err(|e| StorageError::DataDir(e.to_string()))?;
    Ok(dir)
}
