use tokio::sync::broadcast;

use super::EngineState;
use crate::events::Event;

/// Notified after every engine transition, with the state as it stands once
/// the transition has been applied.
///
/// The ambience player hooks in here to start, stop or switch soundscapes; a
/// journal can record `SessionStopped` summaries.
pub trait SessionObserver: Send {
    fn on_session_state_changed(&mut self, state: &EngineState, event: &Event);
}

impl<F> SessionObserver for F
where
    F: FnMut(&EngineState, &Event) + Send,
{
    fn on_session_state_changed(&mut self, state: &EngineState, event: &Event) {
        self(state, event)
    }
}

/// Forwards events to any number of async subscribers.
///
/// Sending never blocks; with no live receivers the event is dropped, and a
/// lagging receiver loses the oldest events first.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    sender: broadcast::Sender<Event>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<Event>) {
        let (sender, receiver) = broadcast::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl SessionObserver for BroadcastObserver {
    fn on_session_state_changed(&mut self, _state: &EngineState, event: &Event) {
        self.sender.send(event.clone()).ok();
    }
}
