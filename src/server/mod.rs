//! Server module for Pixelboard
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `validation`: Startup configuration checks
//! - `background_tasks`: Persistence sync loop startup
//! - `shutdown`: Signal handling
//! - `init`: Main server initialization and run loop

mod background_tasks;
pub mod config;
mod init;
mod loader;
mod shutdown;
mod validation;

// Re-export public API
pub use init::{build_router, run, AppState};
pub use loader::load_config;
