//! Process-wide event channel owned by the engine.
//!
//! Publish once, any number of subscribers. Publishing with no subscribers is
//! not an error; the event is simply dropped.

use tokio::sync::broadcast;

use tabkeeper_core::event::EngineEvent;

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event, returning how many subscribers received it.
    pub fn publish(&self, event: EngineEvent) -> usize {
        tracing::debug!(target: "events", event = event.name(), "publish");
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
