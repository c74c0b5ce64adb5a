//! Delta Broker
//!
//! Publish/subscribe fan-out with an explicit subscriber registry.
//!
//! Every subscription owns a bounded queue (its own `tokio::broadcast`
//! channel). `publish` walks the registry under one lock and never blocks:
//! when a subscriber's queue is full the oldest queued event is overwritten
//! and the subscriber is told how many it missed on its next `recv`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default per-subscriber queue capacity
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Largest per-subscriber queue capacity
pub const MAX_SUBSCRIBER_BUFFER: usize = 65_536;

/// Handle identifying one registration in the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generate a fresh id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Receiving side of a registration, owned by the subscriber
pub struct Subscription<E> {
    id: SubscriptionId,
    receiver: broadcast::Receiver<E>,
}

impl<E: Clone> Subscription<E> {
    /// Handle to pass to [`Broker::unsubscribe`]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the subscription has been removed from the broker
    /// and every event queued before removal has been drained. Cancel safe.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(subscription_id = %self.id, lagged = skipped, "Subscriber lagged, oldest events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next queued event without waiting
    pub fn try_recv(&mut self) -> Option<E> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(subscription_id = %self.id, lagged = skipped, "Subscriber lagged, oldest events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

/// Registry of live subscriptions
pub struct Broker<E> {
    subscribers: Mutex<HashMap<SubscriptionId, broadcast::Sender<E>>>,
    buffer: usize,
}

impl<E: Clone> Broker<E> {
    /// Create a broker whose subscribers each queue up to `buffer` events
    ///
    /// `buffer` is clamped to `1..=MAX_SUBSCRIBER_BUFFER`.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            buffer: buffer.clamp(1, MAX_SUBSCRIBER_BUFFER),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<SubscriptionId, broadcast::Sender<E>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Subscription<E> {
        let (sender, receiver) = broadcast::channel(self.buffer);
        let id = SubscriptionId::new();

        let count = {
            let mut subscribers = self.registry();
            subscribers.insert(id, sender);
            subscribers.len()
        };
        debug!(subscription_id = %id, subscribers = count, "Subscribed");

        Subscription { id, receiver }
    }

    /// Remove a subscriber.
    ///
    /// Dropping the registered sender closes the channel, so the owner's
    /// `recv` loop ends after draining what was already queued.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let removed = self.registry().remove(&id);
        match removed {
            Some(_sender) => {
                debug!(subscription_id = %id, "Unsubscribed");
                Ok(())
            }
            None => Err(Error::SubscriptionNotFound(id)),
        }
    }

    /// Deliver `event` to every registered subscriber.
    ///
    /// Returns the number of subscribers that accepted the event.
    pub fn publish(&self, event: E) -> usize {
        let subscribers = self.registry();
        let mut delivered = 0;
        for (id, sender) in subscribers.iter() {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                trace!(subscription_id = %id, "Receiver dropped before unsubscribe");
            }
        }
        delivered
    }

    /// Number of registered subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }
}

impl<E: Clone> Default for Broker<E> {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Delta;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let broker = Broker::new(16);
        let mut sub = broker.subscribe();

        assert_eq!(broker.publish(Delta::new(1, 2, 3)), 1);
        assert_eq!(sub.recv().await, Some(Delta::new(1, 2, 3)));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let broker = Broker::new(16);
        let mut sub1 = broker.subscribe();
        let mut sub2 = broker.subscribe();
        assert_eq!(broker.subscriber_count(), 2);

        assert_eq!(broker.publish(Delta::new(5, 5, 3)), 2);

        assert_eq!(sub1.recv().await, Some(Delta::new(5, 5, 3)));
        assert_eq!(sub2.recv().await, Some(Delta::new(5, 5, 3)));
    }

    #[test]
    fn test_publish_no_subscribers() {
        let broker: Broker<Delta> = Broker::default();
        assert_eq!(broker.publish(Delta::new(0, 0, 0)), 0);
    }

    #[tokio::test]
    async fn test_event_ordering() {
        let broker = Broker::new(64);
        let mut sub = broker.subscribe();

        for i in 0..50 {
            broker.publish(Delta::new(i, i, (i % 10) as u8));
        }

        for i in 0..50 {
            assert_eq!(sub.recv().await, Some(Delta::new(i, i, (i % 10) as u8)));
        }
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let broker = Broker::new(16);
        broker.publish(Delta::new(0, 0, 1));

        let mut sub = broker.subscribe();
        broker.publish(Delta::new(0, 0, 2));

        assert_eq!(sub.recv().await, Some(Delta::new(0, 0, 2)));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_subscription() {
        let broker = Broker::new(16);
        let mut sub = broker.subscribe();

        broker.publish(Delta::new(1, 1, 1));
        broker.unsubscribe(sub.id()).unwrap();
        assert_eq!(broker.publish(Delta::new(2, 2, 2)), 0);

        // Queued before removal is still drained, then the stream ends
        assert_eq!(sub.recv().await, Some(Delta::new(1, 1, 1)));
        assert_eq!(sub.recv().await, None);
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[test]
    fn test_double_unsubscribe_fails() {
        let broker: Broker<Delta> = Broker::new(16);
        let sub = broker.subscribe();

        assert!(broker.unsubscribe(sub.id()).is_ok());
        let err = broker.unsubscribe(sub.id()).unwrap_err();
        assert!(matches!(err, Error::SubscriptionNotFound(id) if id == sub.id()));
    }

    #[test]
    fn test_unsubscribe_leaves_others() {
        let broker = Broker::new(16);
        let sub1 = broker.subscribe();
        let mut sub2 = broker.subscribe();

        broker.unsubscribe(sub1.id()).unwrap();
        assert_eq!(broker.publish(Delta::new(3, 4, 5)), 1);
        assert_eq!(sub2.try_recv(), Some(Delta::new(3, 4, 5)));
    }

    #[tokio::test]
    async fn test_slow_subscriber_drops_oldest() {
        let broker = Broker::new(4);
        let mut slow = broker.subscribe();
        let mut fast = broker.subscribe();

        for i in 0..10 {
            // Never blocks even though `slow` is not reading
            assert_eq!(broker.publish(Delta::new(0, i, 1)), 2);
            assert_eq!(fast.recv().await, Some(Delta::new(0, i, 1)));
        }

        let mut received = Vec::new();
        while let Some(delta) = slow.try_recv() {
            received.push(delta.x);
        }
        assert_eq!(received, vec![6, 7, 8, 9]);
    }

    #[test]
    fn test_buffer_is_clamped() {
        let huge = Broker::<u32>::new(usize::MAX);
        let mut sub = huge.subscribe();
        assert_eq!(huge.publish(7), 1);
        assert_eq!(sub.try_recv(), Some(7));

        let empty = Broker::<u32>::new(0);
        let mut sub = empty.subscribe();
        empty.publish(1);
        empty.publish(2);
        assert_eq!(sub.try_recv(), Some(2));
    }

    #[test]
    fn test_dropped_receiver_not_counted() {
        let broker = Broker::new(16);
        let sub = broker.subscribe();
        let id = sub.id();
        drop(sub);

        assert_eq!(broker.publish(Delta::new(0, 0, 0)), 0);
        // Still registered until the owner unsubscribes
        assert!(broker.unsubscribe(id).is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let broker = Arc::new(Broker::new(1024));
        let mut sub = broker.subscribe();

        let mut handles = Vec::new();
        for t in 0..4usize {
            let broker = broker.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..100usize {
                    broker.publish(Delta::new(t, i, 0));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Per publisher, order is preserved
        let mut last = [None::<usize>; 4];
        for _ in 0..400 {
            let delta = sub.recv().await.unwrap();
            if let Some(prev) = last[delta.y] {
                assert!(delta.x > prev);
            }
            last[delta.y] = Some(delta.x);
        }
        assert_eq!(sub.try_recv(), None);
    }
}
