//! Observer Session
//!
//! Bridges one broker subscription to one viewer connection. The session
//! subscribes on start, relays deltas until the transport closes or a write
//! fails, and unsubscribes exactly once on the way out.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broker::{Broker, Subscription, SubscriptionId};
use crate::error::Result;
use crate::events::Delta;

/// Outbound half of a viewer transport
#[async_trait]
pub trait DeltaSink: Send {
    /// Write one encoded delta to the viewer
    async fn send(&mut self, payload: String) -> Result<()>;
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The transport signalled closure
    TransportClosed,
    /// Writing to the transport failed
    SendFailed,
    /// The subscription was removed from under the session
    Unsubscribed,
}

/// Per-connection relay from the broker to a viewer
pub struct ObserverSession {
    broker: Arc<Broker<Delta>>,
}

impl ObserverSession {
    /// Create a session bound to `broker`
    #[must_use]
    pub fn new(broker: Arc<Broker<Delta>>) -> Self {
        Self { broker }
    }

    /// Relay deltas to `sink` until `closed` is cancelled or a send fails
    pub async fn run<S: DeltaSink>(self, mut sink: S, closed: CancellationToken) -> SessionEnd {
        let mut subscription = self.broker.subscribe();
        let subscription_id = subscription.id();
        let guard = SubscriptionGuard::new(self.broker.clone(), subscription_id);
        info!(subscription_id = %subscription_id, "Observer session started");

        let end = forward(&mut subscription, &mut sink, &closed).await;

        match guard.release() {
            Ok(()) => {}
            Err(e) if end == SessionEnd::Unsubscribed => {
                error!(
                    subscription_id = %subscription_id,
                    error = %e,
                    "Observer subscription was removed outside its session"
                );
            }
            Err(e) => {
                error!(subscription_id = %subscription_id, error = %e, "Observer session cleanup failed");
            }
        }
        info!(subscription_id = %subscription_id, reason = ?end, "Observer session ended");

        end
    }
}

/// Removes a session's subscription when the session future goes away
///
/// `release` is the normal exit. `Drop` unsubscribes when the session
/// future is dropped before finishing.
struct SubscriptionGuard {
    broker: Arc<Broker<Delta>>,
    id: SubscriptionId,
    released: bool,
}

impl SubscriptionGuard {
    fn new(broker: Arc<Broker<Delta>>, id: SubscriptionId) -> Self {
        Self {
            broker,
            id,
            released: false,
        }
    }

    fn release(mut self) -> Result<()> {
        self.released = true;
        self.broker.unsubscribe(self.id)
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if self.broker.unsubscribe(self.id).is_ok() {
            debug!(subscription_id = %self.id, "Observer session dropped before finishing");
        }
    }
}

async fn forward<S: DeltaSink>(
    subscription: &mut Subscription<Delta>,
    sink: &mut S,
    closed: &CancellationToken,
) -> SessionEnd {
    loop {
        let delta = tokio::select! {
            biased;
            _ = closed.cancelled() => return SessionEnd::TransportClosed,
            delta = subscription.recv() => match delta {
                Some(delta) => delta,
                None => return SessionEnd::Unsubscribed,
            },
        };

        let payload = match delta.to_wire() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to encode delta");
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = closed.cancelled() => return SessionEnd::TransportClosed,
            sent = sink.send(payload) => {
                if let Err(e) = sent {
                    warn!(subscription_id = %subscription.id(), error = %e, "Failed to send delta");
                    return SessionEnd::SendFailed;
                }
            }
        }
    }
}
