//! Fan-out broadcaster.
//!
//! Owns the set of live subscriber channels and delivers each released
//! batch to all of them. A channel that cannot accept a message (closed
//! by the remote end, or full because the consumer stalled) is pruned
//! immediately and never blocks delivery to the rest.

use crate::entities::TransferEvent;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-subscriber channel depth. Batches arrive at the release cadence,
/// so a consumer that falls this far behind is considered dead.
pub const SUBSCRIBER_CHANNEL_BUFFER: usize = 32;

/// A message pushed to a subscriber channel.
#[derive(Debug, Clone)]
pub enum StreamMessage {
    /// Connection confirmation, always the first message on a channel.
    Connected,
    /// One released batch, shared across subscribers.
    Batch(Arc<Vec<TransferEvent>>),
}

type ChannelSet = Vec<(Uuid, mpsc::Sender<StreamMessage>)>;

/// Maintains the live subscriber set and fans batches out to it.
#[derive(Debug, Default)]
pub struct Broadcaster {
    channels: Arc<Mutex<ChannelSet>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber channel.
    ///
    /// The returned [`Subscription`] already holds the
    /// [`StreamMessage::Connected`] confirmation as its first message, so
    /// clients can distinguish "connected, no data yet" from "never
    /// connected". Dropping the subscription unregisters the channel.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_BUFFER);
        let id = Uuid::new_v4();
        // The channel is freshly created with a non-zero buffer, so the
        // confirmation frame always fits.
        let _ = tx.try_send(StreamMessage::Connected);
        self.lock().push((id, tx));
        debug!(subscriber = %id, "subscriber registered");
        Subscription {
            id,
            rx,
            channels: Arc::clone(&self.channels),
        }
    }

    /// Remove a subscriber channel by handle.
    pub fn unsubscribe(&self, id: Uuid) {
        self.lock().retain(|(channel_id, _)| *channel_id != id);
        debug!(subscriber = %id, "subscriber removed");
    }

    /// Deliver `batch` to every currently live channel, in registration
    /// order.
    ///
    /// Returns the number of channels the batch was attempted on, before
    /// any failures were pruned, so callers can detect "no one is
    /// listening". Channels that fail are removed from the live set and
    /// never retried.
    pub fn publish(&self, batch: Vec<TransferEvent>) -> usize {
        let batch = Arc::new(batch);
        let mut channels = self.lock();
        let attempted = channels.len();
        channels.retain(|(id, tx)| {
            match tx.try_send(StreamMessage::Batch(Arc::clone(&batch))) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(subscriber = %id, "subscriber channel closed, pruning");
                    false
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = %id, "subscriber channel full, dropping stalled consumer");
                    false
                }
            }
        });
        attempted
    }

    /// Number of currently live subscriber channels.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelSet> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A live subscriber channel, owned by one consumer.
///
/// Scoped resource: dropping it removes the channel from the broadcaster
/// on every exit path, so a disconnecting consumer is cleaned up even if
/// no publish happens in between.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<StreamMessage>,
    channels: Arc<Mutex<ChannelSet>>,
}

impl Subscription {
    /// Opaque handle identifying this channel.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Receive the next message, or `None` once the channel is pruned
    /// and drained.
    pub async fn recv(&mut self) -> Option<StreamMessage> {
        self.rx.recv().await
    }

    /// Non-blocking receive, for callers on their own schedule.
    pub fn try_recv(&mut self) -> Option<StreamMessage> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels.retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::entities::RawTransfer;
    use crate::lookup::{LabelBook, PriceBook};
    use time::macros::datetime;

    fn event(hash: &str) -> TransferEvent {
        let raw = RawTransfer {
            transaction_hash: hash.to_string(),
            from: "0x1111111111111111111111111111111111111111".to_string(),
            to: "0x2222222222222222222222222222222222222222".to_string(),
            token_name: "Pepe".to_string(),
            token_symbol: "PEPE".to_string(),
            value_with_decimals: "1".to_string(),
            contract_address: None,
        };
        TransferEvent::normalize(
            &raw,
            datetime!(2023-11-14 22:13:20 UTC),
            &PriceBook::default(),
            &LabelBook::default(),
        )
        .unwrap()
    }

    fn batch_hashes(message: StreamMessage) -> Vec<String> {
        match message {
            StreamMessage::Batch(batch) => {
                batch.iter().map(|e| e.transaction_hash.clone()).collect()
            }
            StreamMessage::Connected => panic!("expected a batch"),
        }
    }

    #[test]
    fn test_connected_is_always_first() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe();
        assert!(matches!(sub.try_recv(), Some(StreamMessage::Connected)));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let broadcaster = Broadcaster::new();
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert!(matches!(first.try_recv(), Some(StreamMessage::Connected)));
        assert!(matches!(second.try_recv(), Some(StreamMessage::Connected)));

        let attempted = broadcaster.publish(vec![event("0xA"), event("0xB")]);
        assert_eq!(attempted, 2);
        assert_eq!(batch_hashes(first.try_recv().unwrap()), ["0xA", "0xB"]);
        assert_eq!(batch_hashes(second.try_recv().unwrap()), ["0xA", "0xB"]);
    }

    #[test]
    fn test_closed_channel_pruned_without_blocking_others() {
        let broadcaster = Broadcaster::new();
        let dead = broadcaster.subscribe();
        let dead_id = dead.id();
        let mut live = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        // Simulate a remote close without running the Drop guard path:
        // close the receiver, keep the subscription alive.
        let mut dead = dead;
        dead.rx.close();

        // Attempted on both; the dead one is pruned mid-publish.
        let attempted = broadcaster.publish(vec![event("0xA")]);
        assert_eq!(attempted, 2);
        assert_eq!(broadcaster.subscriber_count(), 1);

        assert!(matches!(live.try_recv(), Some(StreamMessage::Connected)));
        assert_eq!(batch_hashes(live.try_recv().unwrap()), ["0xA"]);

        // Later publishes no longer count the pruned channel.
        assert_eq!(broadcaster.publish(vec![event("0xB")]), 1);
        drop(dead);
        broadcaster.unsubscribe(dead_id);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let broadcaster = Broadcaster::new();
        let sub = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);
        drop(sub);
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(broadcaster.publish(vec![event("0xA")]), 0);
    }
}
