//! Web API module for Pixelboard
//!
//! Provides REST API endpoints for:
//! - Canvas state and pixel writes
//! - Health checks

pub mod canvas;
pub mod health;

use axum::Router;

use crate::server::AppState;

pub use canvas::canvas_routes;
pub use health::health_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router<AppState> {
    Router::new().merge(canvas_routes()).merge(health_routes())
}
