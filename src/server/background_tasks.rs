//! Background task startup functions

use pixelboard_canvas::{Board, CanvasConfig, SnapshotStore};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Start the persistence sync loop
pub fn start_sync_task(
    board: &Board,
    store: Arc<dyn SnapshotStore>,
    config: &CanvasConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let sync_loop = board.sync_loop(store, config);
    let handle = tokio::spawn(sync_loop.run(shutdown));
    info!(
        "Sync loop started (flush interval: {}s)",
        config.flush_interval_secs
    );
    handle
}
