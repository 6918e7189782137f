//! Session lifecycle engine.
//!
//! A wall-clock-based state machine. It does not own a thread; the host (or
//! [`Ticker`](super::Ticker)) calls [`SessionEngine::tick`] periodically and
//! every timing decision compares clock deltas, so any tick rate of at least
//! 1 Hz behaves identically.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(store, Arc::new(SystemClock));
//! engine.start_program_now(&program)?;
//! // In a loop:
//! for event in engine.tick() { /* ... */ }
//! ```

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info, trace, warn};

use super::state::{RunKind, RunningSession, ScheduledSession};
use super::{ClockTime, EngineState, SessionObserver};
use crate::clock::Clock;
use crate::error::{ProgramError, Result};
use crate::events::{Event, SessionSummary, StopReason};
use crate::format::{format_countdown, format_elapsed, progress_pct, PLACEHOLDER};
use crate::program::{Interval, Program, ProgramCatalog};
use crate::session::{SessionConfig, SessionConfigPatch, SessionConfigStore};
use crate::storage::{EngineSettings, KeyValueStore};

pub struct SessionEngine {
    state: EngineState,
    /// Bound for display (e.g. a reschedule dialog) without running.
    loaded_program: Option<Program>,
    config: SessionConfigStore,
    catalog: ProgramCatalog,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    observers: Vec<Box<dyn SessionObserver>>,
    /// Soundscape the ambience player was last told about.
    soundscape: Option<String>,
    last_seen_ms: Option<i64>,
}

impl SessionEngine {
    /// Create an idle engine, restoring session config and programs from `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_settings(store, clock, EngineSettings::default())
    }

    pub fn with_settings(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let config = SessionConfigStore::load(store.clone(), settings.clamp_session_config);
        let catalog = ProgramCatalog::load(store);
        Self {
            state: EngineState::Idle,
            loaded_program: None,
            config,
            catalog,
            clock,
            settings,
            observers: Vec::new(),
            soundscape: None,
            last_seen_ms: None,
        }
    }

    pub fn add_observer(&mut self, observer: impl SessionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn session_config(&self) -> SessionConfig {
        self.config.get()
    }

    pub fn catalog(&self) -> &ProgramCatalog {
        &self.catalog
    }

    /// Edits here never reach a session that is already scheduled or running.
    pub fn catalog_mut(&mut self) -> &mut ProgramCatalog {
        &mut self.catalog
    }

    pub fn loaded_program(&self) -> Option<&Program> {
        self.loaded_program.as_ref()
    }

    pub fn current_interval(&self) -> Option<&Interval> {
        self.state
            .running()
            .and_then(RunningSession::program_progress)
            .and_then(|p| p.current_interval())
    }

    pub fn current_interval_index(&self) -> Option<usize> {
        self.state
            .running()
            .and_then(RunningSession::program_progress)
            .map(|p| p.current_interval_index())
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.state.running().map(|r| r.elapsed_seconds()).unwrap_or(0)
    }

    pub fn interval_elapsed_seconds(&self) -> u64 {
        self.state
            .running()
            .and_then(RunningSession::program_progress)
            .map(|p| p.interval_elapsed_seconds())
            .unwrap_or(0)
    }

    pub fn interval_remaining_seconds(&self) -> u64 {
        self.state
            .running()
            .and_then(RunningSession::program_progress)
            .map(|p| p.interval_remaining_seconds())
            .unwrap_or(0)
    }

    pub fn session_total_seconds(&self) -> u64 {
        self.state.running().map(|r| r.total_secs()).unwrap_or(0)
    }

    pub fn session_remaining_seconds(&self) -> u64 {
        self.state.running().map(|r| r.remaining_secs()).unwrap_or(0)
    }

    /// 0.0 .. 100.0 across the whole session; display only.
    pub fn session_progress_pct(&self) -> f64 {
        progress_pct(self.elapsed_seconds(), self.session_total_seconds())
    }

    /// 0.0 .. 100.0 within the current interval; display only.
    pub fn interval_progress_pct(&self) -> f64 {
        let total = self.current_interval().map(Interval::duration_secs).unwrap_or(0);
        progress_pct(self.interval_elapsed_seconds(), total)
    }

    pub fn time_until_start_seconds(&self) -> u64 {
        self.state
            .scheduled()
            .map(|s| s.time_until_start_secs())
            .unwrap_or(0)
    }

    /// `MM:SS` while running, placeholder otherwise.
    pub fn elapsed_display(&self) -> String {
        match self.state.running() {
            Some(run) => format_elapsed(run.elapsed_seconds()),
            None => PLACEHOLDER.to_string(),
        }
    }

    /// Time until a scheduled start, or time left in a running session.
    pub fn countdown_display(&self) -> String {
        match &self.state {
            EngineState::Idle => PLACEHOLDER.to_string(),
            EngineState::Scheduled(s) => format_countdown(s.time_until_start_secs()),
            EngineState::Running(r) => format_countdown(r.remaining_secs()),
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.state.phase(),
            program_id: self.state.program().map(|p| p.id.clone()),
            current_interval_index: self.current_interval_index(),
            elapsed_secs: self.elapsed_seconds(),
            interval_elapsed_secs: self.interval_elapsed_seconds(),
            remaining_secs: self.session_remaining_seconds(),
            time_until_start_secs: self.time_until_start_seconds(),
            progress_pct: self.session_progress_pct(),
            at: self.at(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a simple session with the current session config.
    pub fn start_session(&mut self) -> Event {
        let now = self.clock.now_ms();
        self.begin_simple(now, false)
    }

    /// Schedule a simple session for the next occurrence of `time` (`HH:MM`).
    ///
    /// # Errors
    /// Returns `InvalidTime` for a malformed time; the state is left unchanged.
    pub fn schedule_session(&mut self, time: &str) -> Result<Event> {
        let start_time: ClockTime = time.parse()?;
        Ok(self.schedule(start_time, None))
    }

    /// Drop a pending schedule. No-op unless scheduled.
    pub fn cancel_schedule(&mut self) -> Option<Event> {
        let EngineState::Scheduled(scheduled) = &self.state else {
            return None;
        };
        let event = Event::ScheduleCancelled {
            start_time: scheduled.start_time(),
            at: self.at(),
        };
        info!(start_time = %scheduled.start_time(), "schedule cancelled");
        self.transition(EngineState::Idle, event.clone());
        Some(event)
    }

    /// Start `program` immediately from its first interval. The engine keeps
    /// its own copy.
    ///
    /// # Errors
    /// Returns `Empty`/`ZeroDuration` for an unrunnable program; the state is
    /// left unchanged.
    pub fn start_program_now(&mut self, program: &Program) -> Result<Event> {
        program.validate()?;
        let now = self.clock.now_ms();
        Ok(self.begin_program(program.clone(), now, false))
    }

    /// Schedule `program` for the next occurrence of `time`.
    ///
    /// # Errors
    /// Returns `InvalidTime` or a program validation error; the state is left
    /// unchanged.
    pub fn schedule_program_for_later(
        &mut self,
        program: &Program,
        time: &str,
    ) -> Result<Event> {
        let start_time: ClockTime = time.parse()?;
        program.validate()?;
        Ok(self.schedule(start_time, Some(program.clone())))
    }

    /// Start the catalog program with `id`.
    ///
    /// # Errors
    /// Returns `NotFound` if the catalog has no such program.
    pub fn start_program_by_id(&mut self, id: &str) -> Result<Event> {
        let program = self.catalog_program(id)?;
        self.start_program_now(&program)
    }

    /// # Errors
    /// Returns `NotFound`, `InvalidTime` or a program validation error.
    pub fn schedule_program_by_id(&mut self, id: &str, time: &str) -> Result<Event> {
        let program = self.catalog_program(id)?;
        self.schedule_program_for_later(&program, time)
    }

    /// Stop the running session. No-op unless running.
    pub fn stop_session(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        self.finish(now, StopReason::Manual, false)
    }

    /// Same as [`stop_session`](Self::stop_session); programs and simple
    /// sessions share one running state.
    pub fn stop_program(&mut self) -> Option<Event> {
        self.stop_session()
    }

    /// Bind `program` as the current selection without starting or scheduling.
    pub fn load_program(&mut self, program: &Program) -> Event {
        self.loaded_program = Some(program.clone());
        let event = Event::ProgramLoaded {
            program_id: program.id.clone(),
            program_name: program.name.clone(),
            at: self.at(),
        };
        debug!(program = %program.name, "program loaded");
        self.notify(&event);
        event
    }

    /// Update and persist the simple-session config. A session already
    /// running keeps the config it started with.
    ///
    /// # Errors
    /// Returns a storage error if the config could not be saved; the new value
    /// is still applied in memory.
    pub fn update_session_config(&mut self, patch: SessionConfigPatch) -> Result<SessionConfig> {
        let result = self.config.set(patch);
        let event = Event::SessionConfigChanged {
            config: self.config.get(),
            at: self.at(),
        };
        self.notify(&event);
        Ok(result?)
    }

    /// Evaluate every time-based rule against the clock.
    ///
    /// Returns the transitions this tick caused, in order. Never fails.
    pub fn tick(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        if let Some(last) = self.last_seen_ms {
            if now < last {
                warn!(jump_ms = last - now, "clock moved backward");
            }
        }
        self.last_seen_ms = Some(now);

        let mut events = Vec::new();
        match &mut self.state {
            EngineState::Idle => {}
            EngineState::Scheduled(scheduled) => {
                scheduled.update_countdown(now);
                let delta = scheduled.delta_ms(now);
                let start_time = scheduled.start_time();
                trace!(delta_ms = delta, "scheduled tick");
                if delta <= 0 {
                    if delta > -self.settings.schedule_grace_ms() {
                        let program = scheduled.program.take();
                        // arrival is not a cancellation
                        self.state = EngineState::Idle;
                        let event = match program {
                            Some(program) => self.begin_program(program, now, true),
                            None => self.begin_simple(now, true),
                        };
                        events.push(event);
                    } else {
                        events.push(self.miss_schedule(now, start_time, delta));
                    }
                }
            }
            EngineState::Running(run) => {
                run.update_elapsed(now);
                trace!(elapsed = run.elapsed_seconds(), "running tick");
                let mut advanced = Vec::new();
                let finished = match &mut run.run {
                    RunKind::Simple { config } => run.elapsed_seconds >= config.duration_secs(),
                    RunKind::Program(progress) => {
                        let outcome = progress.advance(now);
                        advanced = outcome
                            .advanced
                            .into_iter()
                            .filter_map(|(from, to)| {
                                progress
                                    .program
                                    .intervals
                                    .get(to)
                                    .map(|i| (from, to, i.kind, i.duration_secs()))
                            })
                            .collect();
                        outcome.finished
                    }
                };

                let at = self.at_ms(now);
                for (from_index, to_index, kind, duration_secs) in advanced {
                    debug!(from_index, to_index, "interval advanced");
                    let event = Event::IntervalAdvanced {
                        from_index,
                        to_index,
                        kind,
                        duration_secs,
                        at,
                    };
                    self.notify(&event);
                    events.push(event);
                }
                if finished {
                    events.extend(self.finish(now, StopReason::Completed, true));
                }
            }
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn catalog_program(&self, id: &str) -> Result<Program> {
        self.catalog
            .get(id)
            .cloned()
            .ok_or_else(|| ProgramError::NotFound(id.to_string()).into())
    }

    fn begin_simple(&mut self, now: i64, from_schedule: bool) -> Event {
        let config = self.config.get();
        self.replace_current(now);
        let event = Event::SessionStarted {
            program_id: None,
            program_name: None,
            total_secs: config.duration_secs(),
            from_schedule,
            at: self.at_ms(now),
        };
        info!(
            duration_minutes = config.duration_minutes,
            heat = config.heat_celsius,
            from_schedule,
            "session started"
        );
        self.transition(
            EngineState::Running(RunningSession::simple(config, now, from_schedule)),
            event.clone(),
        );
        event
    }

    /// `program` must be validated.
    fn begin_program(&mut self, program: Program, now: i64, from_schedule: bool) -> Event {
        self.replace_current(now);
        let event = Event::SessionStarted {
            program_id: Some(program.id.clone()),
            program_name: Some(program.name.clone()),
            total_secs: program.total_duration_secs(),
            from_schedule,
            at: self.at_ms(now),
        };
        info!(
            program = %program.name,
            intervals = program.intervals.len(),
            from_schedule,
            "program started"
        );
        self.transition(
            EngineState::Running(RunningSession::program_run(program, now, from_schedule)),
            event.clone(),
        );
        event
    }

    fn schedule(&mut self, start_time: ClockTime, program: Option<Program>) -> Event {
        let now = self.clock.now_ms();
        let target = start_time.next_occurrence_ms(now, self.clock.zone());
        self.replace_current(now);
        let event = Event::SessionScheduled {
            start_time,
            target_epoch_ms: target,
            program_id: program.as_ref().map(|p| p.id.clone()),
            at: self.at_ms(now),
        };
        info!(%start_time, in_secs = (target - now) / 1000, "session scheduled");
        self.transition(
            EngineState::Scheduled(ScheduledSession::new(start_time, target, program, now)),
            event.clone(),
        );
        event
    }

    fn miss_schedule(&mut self, now: i64, start_time: ClockTime, delta_ms: i64) -> Event {
        let late_by_secs = delta_ms.unsigned_abs() / 1000;
        warn!(%start_time, late_by_secs, "scheduled start missed");
        let event = Event::ScheduleMissed {
            start_time,
            late_by_secs,
            at: self.at_ms(now),
        };
        self.transition(EngineState::Idle, event.clone());
        event
    }

    /// Clear whatever is scheduled or running before a new intent takes its
    /// place, so two sessions never share fields. The soundscape is left for
    /// the incoming state to sync.
    fn replace_current(&mut self, now: i64) {
        match &self.state {
            EngineState::Idle => {}
            EngineState::Scheduled(scheduled) => {
                let event = Event::ScheduleCancelled {
                    start_time: scheduled.start_time(),
                    at: self.at_ms(now),
                };
                self.state = EngineState::Idle;
                self.notify(&event);
            }
            EngineState::Running(_) => {
                self.end_run(now, StopReason::Replaced, false);
            }
        }
    }

    /// Running -> Idle, then sync the soundscape.
    fn finish(&mut self, now: i64, reason: StopReason, completed: bool) -> Option<Event> {
        let event = self.end_run(now, reason, completed)?;
        self.sync_soundscape();
        Some(event)
    }

    /// Running -> Idle, notifying observers with a summary of the run.
    fn end_run(&mut self, now: i64, reason: StopReason, completed: bool) -> Option<Event> {
        let EngineState::Running(run) = &mut self.state else {
            return None;
        };
        run.update_elapsed(now);
        let summary = summarize(run, completed);
        info!(
            ?reason,
            elapsed_secs = summary.elapsed_secs,
            completed_intervals = summary.completed_intervals,
            "session stopped"
        );
        let event = Event::SessionStopped {
            reason,
            summary,
            at: self.at_ms(now),
        };
        self.state = EngineState::Idle;
        self.notify(&event);
        Some(event)
    }

    fn transition(&mut self, next: EngineState, event: Event) {
        self.state = next;
        self.notify(&event);
        self.sync_soundscape();
    }

    /// Tell the ambience player when the running program's soundscape differs
    /// from what it was last told.
    fn sync_soundscape(&mut self) {
        let current = self
            .state
            .running()
            .and_then(RunningSession::program)
            .and_then(|p| p.soundscape.clone());
        if current == self.soundscape {
            return;
        }
        debug!(soundscape = ?current, "soundscape changed");
        self.soundscape = current.clone();
        let event = Event::SoundscapeChanged {
            soundscape: current,
            at: self.at(),
        };
        self.notify(&event);
    }

    fn notify(&mut self, event: &Event) {
        for observer in self.observers.iter_mut() {
            observer.on_session_state_changed(&self.state, event);
        }
    }

    fn at(&self) -> DateTime<Utc> {
        self.at_ms(self.clock.now_ms())
    }

    fn at_ms(&self, ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
    }
}

fn summarize(run: &RunningSession, completed: bool) -> SessionSummary {
    let program = run.program();
    SessionSummary {
        program_id: program.map(|p| p.id.clone()),
        program_name: program.map(|p| p.name.clone()),
        started_at_epoch_ms: run.started_at_epoch_ms(),
        elapsed_secs: run.elapsed_seconds(),
        completed_intervals: run
            .program_progress()
            .map(|p| p.completed_intervals(completed))
            .unwrap_or(0),
        total_intervals: program.map(|p| p.intervals.len()).unwrap_or(0),
        completed,
    }
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("state", &self.state)
            .field("loaded_program", &self.loaded_program)
            .field("config", &self.config)
            .field("settings", &self.settings)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
