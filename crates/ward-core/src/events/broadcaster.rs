//! Event bus between the engine and its subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::WardEvent;

/// Slow receivers lag (and lose the oldest events) beyond this many.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Cloneable handle to a tokio broadcast channel of [`WardEvent`]s.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<WardEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Publish to every subscriber, returning how many received it.
    pub fn send(&self, event: WardEvent) -> usize {
        let event_type = event.event_type();
        let delivered = self.sender.send(event).unwrap_or_default();
        tracing::trace!(event = %event_type, subscribers = delivered, "ward event published");
        delivered
    }

    /// Only events sent after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<WardEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
