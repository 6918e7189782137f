//! Core error types for saunaflow-core.
//!
//! The engine has very few failure modes. Commands are either rejected at the
//! call boundary (bad time string, empty program) or recovered locally
//! (unreadable persisted data falls back to defaults), so nothing here is
//! ever fatal to the host process.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for saunaflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Scheduling errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Program validation and catalog errors
    #[error("Program error: {0}")]
    Program(#[from] ProgramError),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised when a start time cannot be accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Not an `HH:MM` string, or hour/minute out of range
    #[error("Invalid start time '{input}': expected HH:MM with hour 0-23 and minute 0-59")]
    InvalidTime { input: String },
}

/// Program validation and catalog errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// A program without intervals cannot be started or scheduled
    #[error("Program '{program_id}' has no intervals")]
    Empty { program_id: String },

    /// Every interval must last at least one minute
    #[error("Interval '{interval_id}' has a zero duration")]
    ZeroDuration { interval_id: String },

    /// No program with this id in the catalog
    #[error("Program '{0}' not found")]
    NotFound(String),

    /// Catalog already holds a program with this id
    #[error("Program '{0}' already exists")]
    DuplicateId(String),
}

/// Persistence errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to read or write a backing file
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),

    /// Backing store lock was poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
