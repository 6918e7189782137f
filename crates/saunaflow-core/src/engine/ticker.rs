//! Background tick driver.
//!
//! One tokio task owns the periodic timer and calls [`SessionEngine::tick`]
//! under the same mutex the UI commands take, so a tick and a command can
//! never interleave halfway through a transition.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, trace};

use super::SessionEngine;

/// Engine shared between the ticker and command callers.
pub type SharedEngine = Arc<Mutex<SessionEngine>>;

pub fn shared(engine: SessionEngine) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

/// Handle to a running tick loop. Dropping it without calling
/// [`shutdown`](Self::shutdown) also stops the loop at its next wakeup.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl Ticker {
    /// Spawn the tick loop on the current tokio runtime.
    ///
    /// Missed periods are skipped rather than replayed in a burst; the engine
    /// only looks at the wall clock, so one late tick catches up fully.
    pub fn spawn(engine: SharedEngine, period: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(?period, "ticker started");
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let events = match engine.lock() {
                            Ok(mut engine) => engine.tick(),
                            Err(_) => {
                                error!("engine lock poisoned, stopping ticker");
                                break;
                            }
                        };
                        trace!(events = events.len(), "tick");
                    }
                }
            }
            debug!("ticker stopped");
        });
        Self { handle, shutdown }
    }

    /// Spawn the tick loop with the period from the engine's settings.
    pub fn spawn_with_settings(engine: SharedEngine) -> Self {
        let period = match engine.lock() {
            Ok(engine) => engine.settings().tick_interval(),
            Err(poisoned) => poisoned.into_inner().settings().tick_interval(),
        };
        Self::spawn(engine, period)
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn shutdown(self) {
        self.shutdown.send(true).ok();
        if let Err(err) = self.handle.await {
            error!(error = %err, "ticker task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
