//! yanghook - subscribe to RESTCONF event streams and fire webhooks.
//!
//! This is a thin wrapper over the `yanghook-restconf` library, intended
//! to run unattended next to an NSO or other RESTCONF server.

mod cli;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.json_logs);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            output::error(&format!("{e:#}"));
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Streams) => commands::streams::run(config).await,
        Some(Commands::Info { detail }) => commands::info::run(config, detail).await,
        None => commands::run::run(config).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}
