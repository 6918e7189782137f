//! The single piece of mutable state the engine owns.
//!
//! ```text
//! Idle -> Scheduled -> Running -> Idle
//!   \_______________/^
//! ```
//!
//! Variants carry only the fields meaningful to them; interval position exists
//! only inside a program run. Constructors are crate-private so the interval
//! bounds invariant is established by the engine and nowhere else.

use serde::{Deserialize, Serialize};

use super::ClockTime;
use crate::program::{Interval, Program};
use crate::session::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnginePhase {
    Idle,
    Scheduled,
    Running,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Idle,
    Scheduled(ScheduledSession),
    Running(RunningSession),
}

impl EngineState {
    pub fn phase(&self) -> EnginePhase {
        match self {
            EngineState::Idle => EnginePhase::Idle,
            EngineState::Scheduled(_) => EnginePhase::Scheduled,
            EngineState::Running(_) => EnginePhase::Running,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, EngineState::Idle)
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self, EngineState::Scheduled(_))
    }

    pub fn is_running(&self) -> bool {
        matches!(self, EngineState::Running(_))
    }

    pub fn scheduled(&self) -> Option<&ScheduledSession> {
        match self {
            EngineState::Scheduled(s) => Some(s),
            _ => None,
        }
    }

    pub fn running(&self) -> Option<&RunningSession> {
        match self {
            EngineState::Running(r) => Some(r),
            _ => None,
        }
    }

    /// The program bound to the current schedule or run, if any.
    pub fn program(&self) -> Option<&Program> {
        match self {
            EngineState::Idle => None,
            EngineState::Scheduled(s) => s.program.as_ref(),
            EngineState::Running(r) => r.program(),
        }
    }
}

/// A pending start at the next occurrence of `start_time`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledSession {
    pub(crate) start_time: ClockTime,
    pub(crate) target_epoch_ms: i64,
    pub(crate) program: Option<Program>,
    pub(crate) time_until_start_secs: u64,
}

impl ScheduledSession {
    pub(crate) fn new(
        start_time: ClockTime,
        target_epoch_ms: i64,
        program: Option<Program>,
        now_ms: i64,
    ) -> Self {
        let mut scheduled = Self {
            start_time,
            target_epoch_ms,
            program,
            time_until_start_secs: 0,
        };
        scheduled.update_countdown(now_ms);
        scheduled
    }

    pub fn start_time(&self) -> ClockTime {
        self.start_time
    }

    pub fn target_epoch_ms(&self) -> i64 {
        self.target_epoch_ms
    }

    /// Snapshot of the program to run; `None` means a simple session.
    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// Whole seconds until start, rounded up, as of the last update.
    pub fn time_until_start_secs(&self) -> u64 {
        self.time_until_start_secs
    }

    /// Milliseconds until the target; negative once it has passed.
    pub(crate) fn delta_ms(&self, now_ms: i64) -> i64 {
        self.target_epoch_ms.saturating_sub(now_ms)
    }

    pub(crate) fn update_countdown(&mut self, now_ms: i64) {
        let remaining = self.delta_ms(now_ms).max(0) as u64;
        self.time_until_start_secs = remaining.div_ceil(1000);
    }
}

/// An active session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunningSession {
    pub(crate) started_at_epoch_ms: i64,
    pub(crate) elapsed_seconds: u64,
    pub(crate) from_schedule: bool,
    pub(crate) run: RunKind,
}

/// What drives completion of a running session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RunKind {
    /// Fixed duration from the session config captured at start.
    Simple { config: SessionConfig },
    Program(ProgramRun),
}

impl RunningSession {
    pub(crate) fn simple(config: SessionConfig, now_ms: i64, from_schedule: bool) -> Self {
        Self {
            started_at_epoch_ms: now_ms,
            elapsed_seconds: 0,
            from_schedule,
            run: RunKind::Simple { config },
        }
    }

    /// `program` must already be validated as non-empty.
    pub(crate) fn program_run(program: Program, now_ms: i64, from_schedule: bool) -> Self {
        Self {
            started_at_epoch_ms: now_ms,
            elapsed_seconds: 0,
            from_schedule,
            run: RunKind::Program(ProgramRun {
                program,
                current_interval_index: 0,
                interval_started_at_epoch_ms: now_ms,
                interval_elapsed_seconds: 0,
            }),
        }
    }

    pub fn started_at_epoch_ms(&self) -> i64 {
        self.started_at_epoch_ms
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn from_schedule(&self) -> bool {
        self.from_schedule
    }

    pub fn kind(&self) -> &RunKind {
        &self.run
    }

    pub fn program(&self) -> Option<&Program> {
        self.program_progress().map(ProgramRun::program)
    }

    pub fn program_progress(&self) -> Option<&ProgramRun> {
        match &self.run {
            RunKind::Program(run) => Some(run),
            RunKind::Simple { .. } => None,
        }
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        match &self.run {
            RunKind::Simple { config } => Some(config),
            RunKind::Program(_) => None,
        }
    }

    /// Planned length of the whole session.
    pub fn total_secs(&self) -> u64 {
        match &self.run {
            RunKind::Simple { config } => config.duration_secs(),
            RunKind::Program(run) => run.program.total_duration_secs(),
        }
    }

    pub fn remaining_secs(&self) -> u64 {
        self.total_secs().saturating_sub(self.elapsed_seconds)
    }

    /// Refresh elapsed time. Never decreases, even if the clock went backward.
    pub(crate) fn update_elapsed(&mut self, now_ms: i64) {
        let elapsed = whole_secs_between(self.started_at_epoch_ms, now_ms);
        self.elapsed_seconds = self.elapsed_seconds.max(elapsed);
    }
}

/// Position inside a running program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramRun {
    pub(crate) program: Program,
    pub(crate) current_interval_index: usize,
    pub(crate) interval_started_at_epoch_ms: i64,
    pub(crate) interval_elapsed_seconds: u64,
}

/// Result of applying the interval-advancement rule once.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Advancement {
    /// `(from, to)` pairs, in order.
    pub advanced: Vec<(usize, usize)>,
    /// The last interval has run its full length.
    pub finished: bool,
}

impl ProgramRun {
    /// The running copy, isolated from later catalog edits.
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn current_interval_index(&self) -> usize {
        self.current_interval_index
    }

    pub fn current_interval(&self) -> Option<&Interval> {
        self.program.intervals.get(self.current_interval_index)
    }

    pub fn interval_started_at_epoch_ms(&self) -> i64 {
        self.interval_started_at_epoch_ms
    }

    pub fn interval_elapsed_seconds(&self) -> u64 {
        self.interval_elapsed_seconds
    }

    pub fn interval_remaining_seconds(&self) -> u64 {
        self.current_interval()
            .map(|i| i.duration_secs().saturating_sub(self.interval_elapsed_seconds))
            .unwrap_or(0)
    }

    /// Move past every interval whose full length has elapsed by `now_ms`.
    ///
    /// The next interval starts where the previous one ended rather than at
    /// `now_ms`, so a late tick does not stretch the program. The catch-up is
    /// not capped: after a device sleep longer than the remaining program,
    /// one tick crosses every boundary and finishes the run, matching the
    /// wall-clock time the user actually spent. The index never leaves
    /// `0..len`.
    pub(crate) fn advance(&mut self, now_ms: i64) -> Advancement {
        let mut outcome = Advancement::default();
        let len = self.program.intervals.len();

        while let Some(interval) = self.program.intervals.get(self.current_interval_index) {
            let duration_ms = i64::try_from(interval.duration_secs() * 1000).unwrap_or(i64::MAX);
            let elapsed_ms = now_ms
                .saturating_sub(self.interval_started_at_epoch_ms)
                .max(0);
            if elapsed_ms < duration_ms {
                break;
            }
            if self.current_interval_index + 1 < len {
                let from = self.current_interval_index;
                self.current_interval_index += 1;
                self.interval_started_at_epoch_ms =
                    self.interval_started_at_epoch_ms.saturating_add(duration_ms);
                self.interval_elapsed_seconds = 0;
                outcome.advanced.push((from, self.current_interval_index));
            } else {
                outcome.finished = true;
                break;
            }
        }

        let elapsed = whole_secs_between(self.interval_started_at_epoch_ms, now_ms);
        self.interval_elapsed_seconds = self.interval_elapsed_seconds.max(elapsed);
        outcome
    }

    /// Intervals fully completed so far.
    pub(crate) fn completed_intervals(&self, finished: bool) -> usize {
        if finished {
            self.program.intervals.len()
        } else {
            self.current_interval_index
        }
    }
}

/// `floor((to - from) / 1000)`, clamped at zero.
fn whole_secs_between(from_ms: i64, to_ms: i64) -> u64 {
    (to_ms.saturating_sub(from_ms).max(0) / 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Interval;

    const T0: i64 = 1_700_000_000_000;

    fn two_minute_program() -> Program {
        Program::new(
            "Short",
            vec![Interval::sauna("s1", 1, None), Interval::rest("b1", 1)],
        )
    }

    fn program_state(run: &RunningSession) -> &ProgramRun {
        run.program_progress().unwrap()
    }

    #[test]
    fn elapsed_never_decreases() {
        let mut run = RunningSession::simple(SessionConfig::default(), T0, false);
        run.update_elapsed(T0 + 10_500);
        assert_eq!(run.elapsed_seconds(), 10);
        run.update_elapsed(T0 - 60_000);
        assert_eq!(run.elapsed_seconds(), 10);
        run.update_elapsed(T0 + 11_000);
        assert_eq!(run.elapsed_seconds(), 11);
    }

    #[test]
    fn advances_exactly_at_interval_boundary() {
        let mut run = RunningSession::program_run(two_minute_program(), T0, false);
        let RunKind::Program(progress) = &mut run.run else {
            panic!("expected program run");
        };

        let outcome = progress.advance(T0 + 59_999);
        assert!(outcome.advanced.is_empty());
        assert_eq!(progress.current_interval_index(), 0);
        assert_eq!(progress.interval_elapsed_seconds(), 59);

        let outcome = progress.advance(T0 + 60_000);
        assert_eq!(outcome.advanced, vec![(0, 1)]);
        assert!(!outcome.finished);
        assert_eq!(progress.interval_started_at_epoch_ms(), T0 + 60_000);
        assert_eq!(progress.interval_elapsed_seconds(), 0);

        let outcome = progress.advance(T0 + 120_000);
        assert!(outcome.finished);
        assert_eq!(progress.current_interval_index(), 1);
    }

    #[test]
    fn long_gap_crosses_several_intervals_without_overflowing_index() {
        let program = Program::new(
            "Three",
            vec![
                Interval::sauna("s1", 1, None),
                Interval::rest("b1", 1),
                Interval::sauna("s2", 1, None),
            ],
        );
        let mut run = RunningSession::program_run(program, T0, false);
        let RunKind::Program(progress) = &mut run.run else {
            panic!("expected program run");
        };

        let outcome = progress.advance(T0 + 150_000);
        assert_eq!(outcome.advanced, vec![(0, 1), (1, 2)]);
        assert!(!outcome.finished);
        assert_eq!(progress.interval_elapsed_seconds(), 30);

        let outcome = progress.advance(T0 + 3_600_000);
        assert!(outcome.finished);
        assert_eq!(progress.current_interval_index(), 2);
        assert_eq!(progress.completed_intervals(true), 3);
    }

    #[test]
    fn backward_clock_jump_is_not_completion() {
        let mut run = RunningSession::program_run(two_minute_program(), T0, false);
        let RunKind::Program(progress) = &mut run.run else {
            panic!("expected program run");
        };
        progress.advance(T0 + 30_000);
        let outcome = progress.advance(T0 - 3_600_000);
        assert_eq!(outcome, Advancement::default());
        assert_eq!(progress.current_interval_index(), 0);
        assert_eq!(progress.interval_elapsed_seconds(), 30);
    }

    #[test]
    fn schedule_countdown_rounds_up() {
        let at = ClockTime::new(8, 0).unwrap();
        let mut scheduled = ScheduledSession::new(at, T0 + 30_000, None, T0);
        assert_eq!(scheduled.time_until_start_secs(), 30);
        scheduled.update_countdown(T0 + 29_500);
        assert_eq!(scheduled.time_until_start_secs(), 1);
        scheduled.update_countdown(T0 + 45_000);
        assert_eq!(scheduled.time_until_start_secs(), 0);
        assert_eq!(scheduled.delta_ms(T0 + 45_000), -15_000);
    }

    #[test]
    fn totals_depend_on_run_kind() {
        let simple = RunningSession::simple(SessionConfig::default(), T0, false);
        assert_eq!(simple.total_secs(), 15 * 60);
        assert!(simple.program().is_none());

        let run = RunningSession::program_run(two_minute_program(), T0, false);
        assert_eq!(run.total_secs(), 120);
        assert_eq!(program_state(&run).interval_remaining_seconds(), 60);
        assert_eq!(
            EngineState::Running(run).program().map(|p| p.name.as_str()),
            Some("Short")
        );
    }
}
