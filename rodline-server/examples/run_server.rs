//! Example to run the rodline server standalone
//!
//! Run with: cargo run -p rodline-server --example run_server

use rodline_core::MatchConfig;
use rodline_server::{run_server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig {
        port: 8002,
        static_dir: "web".to_string(),
        game: MatchConfig::versus(),
    };

    println!("Starting rodline server on port {}", config.port);
    println!("Static files from: {}", config.static_dir);
    println!("Join with: POST http://localhost:{}/api/session/join", config.port);

    run_server(config).await
}
