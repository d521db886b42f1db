use tokio::sync::broadcast;

use crate::session::SessionStatus;

/// Notifications for UI subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    /// The transcript changed; read the new snapshot from the engine.
    TranscriptUpdated,
    ToolInvoked { name: String, call_id: String },
    ChannelOpened,
    ChannelClosed,
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers reached.
    pub fn publish(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(SessionEvent::TranscriptUpdated);

        let event = rx.recv().await.unwrap();
        assert_eq!(event, SessionEvent::TranscriptUpdated);
    }

    #[tokio::test]
    async fn multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(SessionEvent::StatusChanged(SessionStatus::Active));

        assert_eq!(
            rx1.recv().await.unwrap(),
            SessionEvent::StatusChanged(SessionStatus::Active)
        );
        assert_eq!(
            rx2.recv().await.unwrap(),
            SessionEvent::StatusChanged(SessionStatus::Active)
        );
    }

    #[test]
    fn publish_returns_zero_with_no_subscribers() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(SessionEvent::ChannelClosed), 0);
    }
}
