//! Error types for pixelboard-canvas
//!
//! Covers caller input errors (coordinates, colors), broker misuse,
//! and failures of the external collaborators (snapshot store, transport).

use thiserror::Error;

use crate::broker::SubscriptionId;

/// Canvas error type
#[derive(Debug, Error)]
pub enum Error {
    /// Coordinate outside the grid
    #[error("pixel ({y}, {x}) is outside the {width}x{height} canvas")]
    OutOfRange {
        /// Requested row
        y: i64,
        /// Requested column
        x: i64,
        /// Canvas width
        width: usize,
        /// Canvas height
        height: usize,
    },

    /// Color outside `0..color_max`
    #[error("color {color} is outside 0..{color_max}")]
    InvalidColor {
        /// Requested color
        color: i64,
        /// Size of the color domain
        color_max: u16,
    },

    /// Unsubscribe on a handle that is no longer registered
    #[error("subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    /// Persisted grid does not fit the configured canvas
    #[error("snapshot has {actual} cells, canvas expects {expected}")]
    SnapshotMismatch {
        /// Cells the canvas holds
        expected: usize,
        /// Cells found in the snapshot
        actual: usize,
    },

    /// Transport write failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a transport error
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a database error
    #[must_use]
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an invalid configuration error
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether the error was caused by caller input and left state untouched
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::InvalidColor { .. })
    }

    /// Get error code for API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfRange { .. } => "out_of_range",
            Self::InvalidColor { .. } => "invalid_color",
            Self::SubscriptionNotFound(_) => "subscription_not_found",
            Self::SnapshotMismatch { .. } => "snapshot_mismatch",
            Self::Transport(_) => "transport_error",
            Self::Database(_) => "database_error",
            Self::Serialization(_) => "serialization_error",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for canvas operations
pub type Result<T> = std::result::Result<T, Error>;
