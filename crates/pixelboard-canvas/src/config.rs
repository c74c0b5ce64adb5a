//! Canvas configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::broker::{DEFAULT_SUBSCRIBER_BUFFER, MAX_SUBSCRIBER_BUFFER};
use crate::error::{Error, Result};

/// Largest color domain a `u8` cell can hold
pub const MAX_COLOR_DOMAIN: u16 = 256;

/// Canvas configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Grid width in cells
    #[serde(default = "default_width")]
    pub width: usize,
    /// Grid height in cells
    #[serde(default = "default_height")]
    pub height: usize,
    /// Number of valid color codes (`COLOR_MAX`)
    #[serde(default = "default_color_domain_size")]
    pub color_domain_size: u16,
    /// Seconds between persistence sync ticks
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Per-observer delta queue capacity
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

fn default_width() -> usize {
    100
}

fn default_height() -> usize {
    100
}

fn default_color_domain_size() -> u16 {
    10
}

fn default_flush_interval_secs() -> u64 {
    1
}

fn default_subscriber_buffer() -> usize {
    DEFAULT_SUBSCRIBER_BUFFER
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            color_domain_size: default_color_domain_size(),
            flush_interval_secs: default_flush_interval_secs(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

impl CanvasConfig {
    /// Set grid dimensions
    #[must_use]
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set color domain size
    #[must_use]
    pub fn with_color_domain_size(mut self, size: u16) -> Self {
        self.color_domain_size = size;
        self
    }

    /// Set flush interval
    #[must_use]
    pub fn with_flush_interval_secs(mut self, secs: u64) -> Self {
        self.flush_interval_secs = secs;
        self
    }

    /// Set per-observer queue capacity
    #[must_use]
    pub fn with_subscriber_buffer(mut self, buffer: usize) -> Self {
        self.subscriber_buffer = buffer;
        self
    }

    /// Flush interval as a `Duration`
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    /// Check every option is usable
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid_config(format!(
                "canvas size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width.checked_mul(self.height).is_none() {
            return Err(Error::invalid_config("canvas size overflows"));
        }
        if self.color_domain_size == 0 || self.color_domain_size > MAX_COLOR_DOMAIN {
            return Err(Error::invalid_config(format!(
                "color_domain_size must be within 1..={}, got {}",
                MAX_COLOR_DOMAIN, self.color_domain_size
            )));
        }
        if self.flush_interval_secs == 0 {
            return Err(Error::invalid_config("flush_interval_secs must be at least 1"));
        }
        if self.subscriber_buffer == 0 || self.subscriber_buffer > MAX_SUBSCRIBER_BUFFER {
            return Err(Error::invalid_config(format!(
                "subscriber_buffer must be within 1..={}, got {}",
                MAX_SUBSCRIBER_BUFFER, self.subscriber_buffer
            )));
        }
        Ok(())
    }
}
