use tokio::sync::broadcast;

use super::types::RegistryEvent;

pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Fan-out channel for [`RegistryEvent`]s.
///
/// Publishing never blocks the ingestor or the sweeper. Slow subscribers lose the oldest
/// events and are told how many they missed on their next receive.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RegistryEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: RegistryEvent) {
        // No subscribers is fine, the event simply has no audience.
        if self.sender.send(event).is_err() {
            tracing::trace!("Dropped registry event: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
