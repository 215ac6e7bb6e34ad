//! Broadcast event bus for distributing `StateEvent` to subscribers.
//!
//! Built on `tokio::sync::broadcast`. Front ends subscribe to re-render on
//! change instead of polling controller state. Publishing with no active
//! subscribers is a no-op.

use murmur_types::event::StateEvent;
use tokio::sync::broadcast;

/// Multi-consumer event bus for session state changes.
///
/// Wraps a `tokio::sync::broadcast` channel. Cloning the bus clones the
/// sender, allowing multiple producers and consumers.
pub struct EventBus {
    sender: broadcast::Sender<StateEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    ///
    /// Streaming publishes one event per fragment, so a capacity of a few
    /// hundred avoids lagging slow subscribers during long responses.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: StateEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_subscribe_delivers_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(StateEvent::ChatsChanged);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, StateEvent::ChatsChanged);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(StateEvent::SettingsChanged);

        assert_eq!(rx1.recv().await.unwrap(), StateEvent::SettingsChanged);
        assert_eq!(rx2.recv().await.unwrap(), StateEvent::SettingsChanged);
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new(16);
        bus.publish(StateEvent::MessagesChanged);
    }
}
