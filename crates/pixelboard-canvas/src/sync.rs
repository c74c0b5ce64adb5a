//! Persistence Sync Loop
//!
//! Flushes the canvas to the snapshot store on a fixed cadence, only when
//! something changed since the previous flush. Writers never wait on it.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::persistence::SnapshotStore;
use crate::store::CanvasStore;

/// Result of one sync tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No mutation since the last tick
    Clean,
    /// Snapshot handed to the store
    Flushed,
    /// Store rejected the snapshot; the dirty flag stays cleared
    Failed,
}

/// Periodic canvas-to-store reconciler
pub struct SyncLoop {
    canvas: Arc<CanvasStore>,
    store: Arc<dyn SnapshotStore>,
    interval: Duration,
}

impl SyncLoop {
    /// Create a sync loop ticking every `interval`
    #[must_use]
    pub fn new(canvas: Arc<CanvasStore>, store: Arc<dyn SnapshotStore>, interval: Duration) -> Self {
        Self {
            canvas,
            store,
            interval,
        }
    }

    /// Run one reconciliation step
    pub async fn tick(&self) -> SyncOutcome {
        if !self.canvas.take_dirty() {
            return SyncOutcome::Clean;
        }

        let snapshot = self.canvas.snapshot();
        match self.store.upsert_latest(&snapshot).await {
            Ok(()) => {
                debug!(cells = snapshot.cells.len(), "Canvas flushed");
                SyncOutcome::Flushed
            }
            Err(e) => {
                error!(error = %e, "Canvas flush failed");
                SyncOutcome::Failed
            }
        }
    }

    /// Tick until `shutdown` is cancelled, then make one last flush attempt
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown.cancelled() => {
                    info!("Sync loop shutting down");
                    break;
                }
            }
        }

        if self.tick().await == SyncOutcome::Flushed {
            info!("Final canvas flush complete");
        }
    }
}
