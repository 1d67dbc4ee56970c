//! CLI module for cascade-select
//!
//! - `walk`: run a selection chain against the configured fetcher
//! - `levels`: print the configured chain

pub mod levels;
pub mod walk;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::observability::init_tracing;

/// cascade-select - cascading dependent selection for portal forms
#[derive(Parser)]
#[command(name = "cascade-select")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load the chain, apply selections in order and print every level
    Walk(walk::WalkArgs),

    /// Print the configured chain definition
    Levels,
}

/// Load configuration and start tracing
fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let loaded = AppConfig::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    init_tracing(&config.logging, &config.observability.tracing);

    if let Err(e) = loaded {
        tracing::warn!("Failed to load configuration, using defaults: {}", e);
    }

    config
}
