//! # Saunaflow Core Library
//!
//! Session lifecycle and scheduling for sauna sessions. The UI issues
//! commands and reads derived values; it never computes timing itself.
//!
//! ## Architecture
//!
//! - **Session Engine**: A wall-clock-based state machine (`Idle`,
//!   `Scheduled`, `Running`) that the caller advances with `tick()`
//! - **Ticker**: Optional tokio task that ticks a shared engine periodically
//! - **Programs**: Ordered sauna/break intervals plus ambience metadata,
//!   kept in a persisted catalog
//! - **Storage**: Key-value persistence for session config and programs,
//!   TOML engine settings
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core lifecycle state machine
//! - [`Ticker`]: Periodic tick driver
//! - [`ProgramCatalog`]: User program library
//! - [`SessionConfigStore`]: Persisted simple-session settings
//! - [`Clock`]: Injectable time source

pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod program;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock, Zone};
pub use engine::{
    BroadcastObserver, ClockTime, EnginePhase, EngineState, SessionEngine, SessionObserver,
    SharedEngine, Ticker,
};
pub use error::{CoreError, ProgramError, ScheduleError, StorageError};
pub use events::{Event, SessionSummary, StopReason};
pub use format::{format_countdown, format_elapsed, progress_pct};
pub use program::{Intensity, Interval, IntervalKind, Program, ProgramCatalog};
pub use session::{SessionConfig, SessionConfigPatch, SessionConfigStore};
pub use storage::{EngineSettings, JsonFileStore, KeyValueStore, MemoryStore};
