//! Perilous - unified CLI
//!
//! Serves the REST API or plays all-bot games from the terminal.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use perilous_rules::Difficulty;
use perilous_server::{AppState, ServerConfig, app, router, simulate};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,perilous_server=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Serve { port, offline } => {
            let mut config = config;
            if let Some(port) = port {
                config = config.with_port(port);
            }
            if offline {
                config = config.offline();
            }
            run_http_server(config).await
        }
        Command::Simulate {
            bots,
            difficulty,
            seed,
            offline,
        } => {
            let config = if offline { config.offline() } else { config };
            run_simulation(config, bots, difficulty, seed).await
        }
    }
}

fn load_config(path: &Path) -> Result<ServerConfig> {
    if path.exists() {
        ServerConfig::from_file(path).context("loading config")
    } else {
        warn!(path = %path.display(), "Config file not found, using defaults");
        Ok(ServerConfig::default())
    }
}

/// Run the HTTP game server
async fn run_http_server(config: ServerConfig) -> Result<()> {
    let orchestrator = app::orchestrator(&config, None).context("opening game store")?;
    let state = AppState::new(orchestrator, *config.server().auto_bots());
    let app = router(state);

    let addr = format!("{}:{}", config.server().host(), config.server().port());
    info!(%addr, "Starting perilous HTTP server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server ready at http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Play an all-bot game and print the log
async fn run_simulation(
    config: ServerConfig,
    bots: usize,
    difficulty: Difficulty,
    seed: Option<u64>,
) -> Result<()> {
    // Simulations never wait between moves.
    let orchestrator = app::orchestrator(&config, seed).context("opening game store")?;
    let simulation = simulate(&orchestrator, bots, difficulty).await?;
    for line in &simulation.log {
        println!("{line}");
    }
    if !simulation.finished() {
        warn!("Simulation stopped before the game ended");
    }
    Ok(())
}
