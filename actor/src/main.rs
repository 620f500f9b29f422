//! Actor - episode runner for the agar.io environment
//!
//! A command-line process that:
//! 1. Builds an environment on the reference arena from config.toml and CLI flags
//! 2. Runs random-walk episodes through the reset/step protocol
//! 3. Writes run statistics to `<data_dir>/actor_stats.json`
//! 4. Optionally records agent 0's view and writes it as a GIF

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod actor;
mod config;
mod stats;

use crate::actor::Actor;
use crate::config::Config;

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Validate configuration
    config.validate()?;

    // Initialize tracing
    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");

    info!(
        "Running {} episodes of the {} environment",
        config.episodes, config.observation
    );

    let mut actor = Actor::new(config)?;
    match actor.run() {
        Ok(Some(video)) => {
            info!("Actor completed successfully, video at {}", video.display());
            Ok(())
        }
        Ok(None) => {
            info!("Actor completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Actor failed: {:#}", e);
            Err(e)
        }
    }
}
