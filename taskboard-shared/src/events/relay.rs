/// Notification relays
///
/// [`BroadcastRelay`] fans events out over a `tokio::sync::broadcast` channel.
/// Subscribers that fall more than `capacity` events behind lose the oldest
/// ones; publishing with no subscribers drops the event.

use tokio::sync::broadcast;
use tracing::trace;

use super::ChangeEvent;

/// Sink for change notifications
pub trait Relay: Send + Sync {
    /// Hands off an event without waiting for delivery
    fn publish(&self, event: ChangeEvent);
}

/// Broadcast-channel relay
#[derive(Debug, Clone)]
pub struct BroadcastRelay {
    sender: broadcast::Sender<ChangeEvent>,
}

impl BroadcastRelay {
    /// Creates a relay buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Relay for BroadcastRelay {
    fn publish(&self, event: ChangeEvent) {
        let kind = event.kind;
        match self.sender.send(event) {
            Ok(receivers) => trace!(kind = kind.as_str(), receivers, "Published change event"),
            Err(_) => trace!(kind = kind.as_str(), "No subscribers; change event dropped"),
        }
    }
}

/// Relay that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRelay;

impl Relay for NoopRelay {
    fn publish(&self, _event: ChangeEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeKind;
    use uuid::Uuid;

    fn event() -> ChangeEvent {
        let actor = Uuid::new_v4();
        ChangeEvent::new(ChangeKind::TaskCreated, Uuid::new_v4(), None, actor, vec![actor])
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let relay = BroadcastRelay::new(8);
        let mut first = relay.subscribe();
        let mut second = relay.subscribe();
        assert_eq!(relay.subscriber_count(), 2);

        let sent = event();
        relay.publish(sent.clone());

        assert_eq!(first.recv().await.unwrap(), sent);
        assert_eq!(second.recv().await.unwrap(), sent);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let relay = BroadcastRelay::new(8);
        relay.publish(event());
        NoopRelay.publish(event());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_loses_oldest() {
        let relay = BroadcastRelay::new(1);
        let mut rx = relay.subscribe();

        relay.publish(event());
        let latest = event();
        relay.publish(latest.clone());

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap(), latest);
    }
}
