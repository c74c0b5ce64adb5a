//! Pixelboard Canvas - shared pixel grid with live observers
//!
//! This crate provides the core of Pixelboard:
//! - Store: the bounds-checked pixel grid and its dirty flag
//! - Broker: publish/subscribe fan-out of pixel deltas
//! - Sync: periodic flush of dirty canvas state to durable storage
//! - Session: per-viewer relay from a subscription to a transport
//! - Persistence: snapshot store adapter and its SQLite implementation
//! - Board: store and broker wired together
//!
//! ## Usage
//!
//! ```ignore
//! use pixelboard_canvas::{Board, CanvasConfig, SqliteSnapshotStore};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = CanvasConfig::default();
//! let store = Arc::new(SqliteSnapshotStore::new(pool));
//! store.init().await?;
//!
//! let board = Board::load(&config, store.as_ref()).await?;
//! tokio::spawn(board.sync_loop(store, &config).run(CancellationToken::new()));
//!
//! board.set_pixel(5, 5, 3)?;
//! ```
//!
//! ## Delivery
//!
//! Each observer has a bounded queue. Publishing never blocks the writer;
//! an observer that falls behind loses its oldest queued deltas.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod board;
pub mod broker;
pub mod config;
pub mod error;
pub mod events;
pub mod persistence;
pub mod session;
pub mod store;
pub mod sync;

// Re-export main types
pub use board::Board;
pub use broker::{
    Broker, Subscription, SubscriptionId, DEFAULT_SUBSCRIBER_BUFFER, MAX_SUBSCRIBER_BUFFER,
};
pub use config::CanvasConfig;
pub use error::{Error, Result};
pub use events::Delta;
pub use persistence::{SnapshotStore, SqliteSnapshotStore};
pub use session::{DeltaSink, ObserverSession, SessionEnd};
pub use store::{CanvasSnapshot, CanvasStore};
pub use sync::{SyncLoop, SyncOutcome};
