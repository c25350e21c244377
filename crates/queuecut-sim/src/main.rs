//! # Queuecut Sim
//!
//! Headless runner for the queue-cutting simulation.
//!
//! Loads a TOML config, spawns a queue, lets a scripted player try to cut
//! in for the configured duration and prints a JSON summary.
//!
//! Usage: `queuecut-sim [CONFIG]` or `queuecut-sim --init` to write the
//! default config to the user config directory.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod runner;
mod sink;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::RunnerConfig;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("queuecut=info".parse()?))
        .init();

    info!("Queuecut sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match std::env::args().nth(1) {
        Some(flag) if flag == "--init" => {
            let path = RunnerConfig::default().save()?;
            info!("Wrote default config to {}", path.display());
            return Ok(());
        },
        Some(path) => RunnerConfig::load_from(path),
        None => RunnerConfig::load(),
    };
    config.check()?;
    config.validate();

    let summary = runner::run(&config)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!("Queuecut sim finished");
    Ok(())
}
