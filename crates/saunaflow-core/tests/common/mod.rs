//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use saunaflow_core::{
    Intensity, Interval, KeyValueStore, ManualClock, MemoryStore, Program, SessionEngine,
};

/// Install a test-writer subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Manual clock at 2026-03-01 `h:m:s` UTC.
pub fn clock_at(h: u32, m: u32, s: u32) -> ManualClock {
    ManualClock::at(Utc.with_ymd_and_hms(2026, 3, 1, h, m, s).unwrap())
}

pub fn engine_with(clock: &ManualClock) -> SessionEngine {
    init_tracing();
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    SessionEngine::new(store, Arc::new(clock.clone()))
}

/// Sauna 1 min, break 1 min.
pub fn two_minute_program() -> Program {
    Program::new(
        "Two minutes",
        vec![Interval::sauna("heat", 1, None), Interval::rest("cool", 1)],
    )
    .with_id("two-minutes")
}

pub fn classic_program() -> Program {
    Program::new(
        "Finnish classic",
        vec![
            Interval::sauna("round-1", 15, Some(Intensity::Warm)),
            Interval::rest("cool-down", 5),
            Interval::sauna("round-2", 15, Some(Intensity::Hot)),
        ],
    )
    .with_id("classic")
    .with_soundscape("lakeside")
}
