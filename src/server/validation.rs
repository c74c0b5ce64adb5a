//! Startup configuration validation

use super::config::AppConfig;
use anyhow::{Context, Result};
use tracing::warn;

/// Reject configurations the server cannot run with
pub fn validate_config(config: &AppConfig) -> Result<()> {
    config
        .canvas
        .validate()
        .context("Invalid [canvas] configuration")?;

    if config.database.max_connections == 0 {
        anyhow::bail!("[database] max_connections must be at least 1");
    }

    if config.database.url.contains(":memory:") {
        warn!("Snapshot database is in memory; the canvas will not survive a restart");
    }

    Ok(())
}
