//! Server initialization and main run loop

use super::background_tasks::start_sync_task;
use super::config::AppConfig;
use super::loader::load_config;
use super::shutdown::shutdown_signal;
use super::validation::validate_config;
use anyhow::{Context, Result};
use axum::Router;
use pixelboard_canvas::{Board, SnapshotStore, SqliteSnapshotStore};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// State shared by every route
#[derive(Clone)]
pub struct AppState {
    pub board: Board,
    /// Cancelled on shutdown; observer sessions hang child tokens off it
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(board: Board, shutdown: CancellationToken) -> Self {
        Self { board, shutdown }
    }
}

/// Build the main router with all endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(crate::api::api_router())
        .merge(crate::websocket::websocket_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting Pixelboard v{}", env!("CARGO_PKG_VERSION"));

    let config: AppConfig = load_config().context("Failed to load configuration")?;
    info!("Configuration loaded");

    validate_config(&config)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to snapshot database")?;

    let snapshot_store = Arc::new(SqliteSnapshotStore::new(pool));
    snapshot_store
        .init()
        .await
        .context("Failed to initialize snapshot schema")?;
    let snapshot_store: Arc<dyn SnapshotStore> = snapshot_store;

    let board = Board::load(&config.canvas, snapshot_store.as_ref())
        .await
        .context("Failed to load canvas snapshot")?;
    info!(
        "Canvas ready ({}x{}, {} colors)",
        config.canvas.width, config.canvas.height, config.canvas.color_domain_size
    );

    let shutdown = CancellationToken::new();
    let sync_handle = start_sync_task(
        &board,
        snapshot_store,
        &config.canvas,
        shutdown.child_token(),
    );

    let app = build_router(AppState::new(board, shutdown.clone()));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("HTTP server error")?;

    // Server may also stop on its own; make sure the sync loop hears about it
    shutdown.cancel();

    info!("Waiting for final canvas flush...");
    let flush_timeout = tokio::time::Duration::from_secs(5);
    match tokio::time::timeout(flush_timeout, sync_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Sync task error: {}", e),
        Err(_) => warn!("Sync task shutdown timeout"),
    }

    info!("Pixelboard shutdown complete");
    Ok(())
}
