//! WebSocket module for Pixelboard
//!
//! - /ws - live pixel delta stream

pub mod observer;

pub use observer::observer_handler;

use axum::{routing::get, Router};

use crate::server::AppState;

/// Create the WebSocket router
pub fn websocket_router() -> Router<AppState> {
    Router::new().route("/ws", get(observer_handler))
}
