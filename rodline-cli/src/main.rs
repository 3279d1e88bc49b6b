//! rodline CLI - Command-line interface
//!
//! Commands:
//! - play: Human against the AI (or hot-seat) on the terminal
//! - simulate: AI vs AI series with aggregate results
//! - serve: Host an authoritative session over HTTP

mod options;
mod play_cmd;
mod server;
mod simulate_cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rodline")]
#[command(about = "rodline - connect lines on a grid of rods")]
#[command(version)]
struct Cli {
    /// Random seed for reproducible AI play
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game on the terminal
    Play(play_cmd::PlayArgs),
    /// Run AI vs AI games and report results
    Simulate(simulate_cmd::SimulateArgs),
    /// Host an authoritative session
    Serve(server::ServerArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Play(args) => play_cmd::run(args, cli.seed),
        Commands::Simulate(args) => simulate_cmd::run(args, cli.seed),
        Commands::Serve(args) => server::run(args, cli.seed),
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises the default level
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
