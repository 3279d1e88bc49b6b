//! Server command - host an authoritative session
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: configure_server(), start_server()
//! - Level 3: (delegated to rodline-server crate)
//! - Level 4: configuration validation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use rodline_core::{MatchConfig, Seat};
use rodline_server::{run_server, ServerConfig};

use crate::options::GameOptions;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct ServerArgs {
    /// Port number to listen on
    #[arg(long, default_value = "8002")]
    pub port: u16,

    /// Directory containing static files for a browser client
    #[arg(long, default_value = "web")]
    pub static_dir: PathBuf,

    /// Player Two is the AI instead of a second remote peer
    #[arg(long)]
    pub vs_ai: bool,

    #[command(flatten)]
    pub options: GameOptions,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run server command
///
/// This function reads like a table of contents:
/// 1. Configure server
/// 2. Start server (blocking)
pub fn run(args: ServerArgs, seed: Option<u64>) -> Result<()> {
    let config = configure_server(&args, seed)?;

    tracing::info!(
        "Starting rodline session '{}' on port {}",
        config.game.name,
        config.port
    );

    start_server(config)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Configure server from command arguments
fn configure_server(args: &ServerArgs, seed: Option<u64>) -> Result<ServerConfig> {
    validate_static_dir(&args.static_dir)?;

    let preset = if args.vs_ai {
        MatchConfig::single_player()
    } else {
        MatchConfig::versus()
    };
    let game = args.options.resolve(preset, seed)?;
    if !game.seats.contains(&Seat::Human) {
        tracing::warn!("No human seats: connected peers can only watch");
    }

    Ok(ServerConfig {
        port: args.port,
        static_dir: args.static_dir.to_string_lossy().to_string(),
        game,
    })
}

/// Start the server (blocking)
fn start_server(config: ServerConfig) -> Result<()> {
    // Create tokio runtime for async server
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    runtime.block_on(async { run_server(config).await })
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Validate that static directory exists
fn validate_static_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        tracing::warn!(
            "Static directory does not exist: {}. Server will start but may not serve files.",
            path.display()
        );
    } else if !path.is_dir() {
        anyhow::bail!(
            "Static path exists but is not a directory: {}",
            path.display()
        );
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
