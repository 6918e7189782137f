use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{ClockTime, EnginePhase};
use crate::program::IntervalKind;
use crate::session::SessionConfig;

/// Every state change in the engine produces an Event.
/// The UI polls snapshots; observers receive the transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        program_id: Option<String>,
        program_name: Option<String>,
        total_secs: u64,
        /// True when the start was triggered by a schedule arriving.
        from_schedule: bool,
        at: DateTime<Utc>,
    },
    SessionScheduled {
        start_time: ClockTime,
        target_epoch_ms: i64,
        program_id: Option<String>,
        at: DateTime<Utc>,
    },
    ScheduleCancelled {
        start_time: ClockTime,
        at: DateTime<Utc>,
    },
    /// The tick that observed the start time came later than the grace window.
    ScheduleMissed {
        start_time: ClockTime,
        late_by_secs: u64,
        at: DateTime<Utc>,
    },
    IntervalAdvanced {
        from_index: usize,
        to_index: usize,
        kind: IntervalKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    SessionStopped {
        reason: StopReason,
        summary: SessionSummary,
        at: DateTime<Utc>,
    },
    ProgramLoaded {
        program_id: String,
        program_name: String,
        at: DateTime<Utc>,
    },
    /// The ambience player should switch tracks (or stop, on `None`).
    SoundscapeChanged {
        soundscape: Option<String>,
        at: DateTime<Utc>,
    },
    SessionConfigChanged {
        config: SessionConfig,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: EnginePhase,
        program_id: Option<String>,
        current_interval_index: Option<usize>,
        elapsed_secs: u64,
        interval_elapsed_secs: u64,
        remaining_secs: u64,
        time_until_start_secs: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    /// Stopped by the user.
    Manual,
    /// Ran to the end of its configured duration or last interval.
    Completed,
    /// Overwritten by a newer start or schedule command.
    Replaced,
}

/// What a finished run accomplished, for journal/analytics collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub program_id: Option<String>,
    pub program_name: Option<String>,
    pub started_at_epoch_ms: i64,
    pub elapsed_secs: u64,
    /// Intervals fully finished before the stop. Zero for simple sessions.
    pub completed_intervals: usize,
    pub total_intervals: usize,
    pub completed: bool,
}
