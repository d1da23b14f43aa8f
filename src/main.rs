//! h5p-relay - HTTP relay in front of an H5P editor/player engine.

mod cli;
mod config;
mod core;
mod engine;
mod identity;
mod logger;
mod upload;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{RelayConfig, init_config};
use engine::fs::FsEngineFactory;
use identity::StaticIdentity;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = init_config(RelayConfig::load(&cli)?);

    match &cli.command {
        Commands::Init { dry } => cli::init::new_project(&config, *dry),
        Commands::Serve { .. } => serve(&config),
    }
}

/// Start the relay over the filesystem engine.
fn serve(config: &RelayConfig) -> Result<()> {
    let factory = Arc::new(FsEngineFactory::from_config(config));
    let identity = Arc::new(StaticIdentity::from_config(&config.user));

    let server = cli::serve::bind_server(factory, identity)?;
    let addr = server.addr();
    debug!("serve"; "{} workers", config.serve.workers);
    server.run()?;

    log!("serve"; "stopped listening on {}", addr);
    Ok(())
}
