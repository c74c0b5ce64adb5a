//! Board
//!
//! Ties the canvas store to the delta broker: a committed write is published
//! to every observer before `set_pixel` returns.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::broker::Broker;
use crate::config::CanvasConfig;
use crate::error::Result;
use crate::events::Delta;
use crate::persistence::SnapshotStore;
use crate::session::ObserverSession;
use crate::store::{CanvasSnapshot, CanvasStore};
use crate::sync::SyncLoop;

/// Shared canvas plus its observers
#[derive(Clone)]
pub struct Board {
    canvas: Arc<CanvasStore>,
    broker: Arc<Broker<Delta>>,
}

impl Board {
    /// Create a zero-filled board
    #[must_use]
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            canvas: Arc::new(CanvasStore::from_config(config)),
            broker: Arc::new(Broker::new(config.subscriber_buffer)),
        }
    }

    /// Create a board, restoring the latest persisted snapshot if it fits.
    ///
    /// A snapshot with other dimensions or out-of-domain colors is ignored
    /// and the board starts zero-filled. Errors from the store itself are
    /// returned.
    pub async fn load(config: &CanvasConfig, store: &dyn SnapshotStore) -> Result<Self> {
        let board = Self::new(config);

        match store.load_latest().await? {
            Some(snapshot) if snapshot.width == config.width && snapshot.height == config.height => {
                match board.canvas.restore(snapshot.cells) {
                    Ok(()) => info!(width = config.width, height = config.height, "Canvas restored from snapshot"),
                    Err(e) => warn!(error = %e, "Stored snapshot rejected, starting blank"),
                }
            }
            Some(snapshot) => {
                warn!(
                    stored_width = snapshot.width,
                    stored_height = snapshot.height,
                    width = config.width,
                    height = config.height,
                    "Stored snapshot does not match canvas size, starting blank"
                );
            }
            None => info!("No stored snapshot, starting blank"),
        }

        Ok(board)
    }

    /// Commit a pixel and publish its delta
    pub fn set_pixel(&self, y: i64, x: i64, color: i64) -> Result<Delta> {
        let delta = self.canvas.set_pixel(y, x, color)?;
        let delivered = self.broker.publish(delta);
        debug!(y = delta.y, x = delta.x, color = delta.color, delivered, "Delta published");
        Ok(delta)
    }

    /// Consistent copy of the canvas
    #[must_use]
    pub fn snapshot(&self) -> CanvasSnapshot {
        self.canvas.snapshot()
    }

    /// Start a session for one viewer connection
    #[must_use]
    pub fn observer(&self) -> ObserverSession {
        ObserverSession::new(self.broker.clone())
    }

    /// Build the persistence loop for this board
    #[must_use]
    pub fn sync_loop(&self, store: Arc<dyn SnapshotStore>, config: &CanvasConfig) -> SyncLoop {
        SyncLoop::new(self.canvas.clone(), store, config.flush_interval())
    }

    /// Underlying canvas store
    #[must_use]
    pub fn canvas(&self) -> &Arc<CanvasStore> {
        &self.canvas
    }

    /// Underlying broker
    #[must_use]
    pub fn broker(&self) -> &Arc<Broker<Delta>> {
        &self.broker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::persistence::MockSnapshotStore;

    fn config() -> CanvasConfig {
        CanvasConfig::default().with_size(4, 4)
    }

    #[tokio::test]
    async fn test_set_pixel_publishes() {
        let board = Board::new(&config());
        let mut sub = board.broker().subscribe();

        let delta = board.set_pixel(1, 2, 3).unwrap();
        assert_eq!(sub.recv().await, Some(delta));
        assert_eq!(board.snapshot().get(1, 2), Some(3));
    }

    #[test]
    fn test_rejected_write_publishes_nothing() {
        let board = Board::new(&config());
        let mut sub = board.broker().subscribe();

        assert!(board.set_pixel(4, 0, 1).is_err());
        assert!(board.set_pixel(0, 0, 10).is_err());
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_load_restores_snapshot() {
        let mut store = MockSnapshotStore::new();
        store.expect_load_latest().returning(|| {
            Ok(Some(CanvasSnapshot {
                width: 4,
                height: 4,
                cells: (0..16).map(|i| (i % 10) as u8).collect(),
            }))
        });

        let board = Board::load(&config(), &store).await.unwrap();
        assert_eq!(board.snapshot().get(1, 1), Some(5));
        assert!(!board.canvas().is_dirty());
    }

    #[tokio::test]
    async fn test_load_ignores_other_dimensions() {
        let mut store = MockSnapshotStore::new();
        store.expect_load_latest().returning(|| {
            Ok(Some(CanvasSnapshot {
                width: 2,
                height: 2,
                cells: vec![1; 4],
            }))
        });

        let board = Board::load(&config(), &store).await.unwrap();
        assert_eq!(board.snapshot().cells, vec![0; 16]);
    }

    #[tokio::test]
    async fn test_load_propagates_store_error() {
        let mut store = MockSnapshotStore::new();
        store
            .expect_load_latest()
            .returning(|| Err(Error::database("unreachable")));

        let result = Board::load(&config(), &store).await;
        assert!(matches!(result, Err(Error::Database(_))));
    }
}
