mod clock_time;
mod lifecycle;
mod observer;
mod state;
mod ticker;

pub use clock_time::ClockTime;
pub use lifecycle::SessionEngine;
pub use observer::{BroadcastObserver, SessionObserver};
pub use state::{EnginePhase, EngineState, ProgramRun, RunKind, RunningSession, ScheduledSession};
pub use ticker::{shared, SharedEngine, Ticker};
