//! CLI module for Pixelboard
//!
//! - `serve`: start the server (default)
//! - `config`: print the resolved configuration

use clap::{Parser, Subcommand};

/// Pixelboard CLI
#[derive(Parser, Debug)]
#[command(name = "pixelboard")]
#[command(about = "Shared pixel canvas with live viewers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve,
    /// Print the resolved configuration as TOML
    Config,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Config) => {
            let config = crate::server::load_config()?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Some(Commands::Serve) | None => crate::server::run().await,
    }
}
