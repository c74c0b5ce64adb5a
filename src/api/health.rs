//! Health check endpoint
//!
//! `/health` reports liveness plus live viewer count and pending-flush state.

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::server::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Connected observer sessions
    pub subscribers: usize,
    /// Mutations not yet flushed to storage
    pub dirty: bool,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        subscribers: state.board.broker().subscriber_count(),
        dirty: state.board.canvas().is_dirty(),
    })
}

/// Create health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
