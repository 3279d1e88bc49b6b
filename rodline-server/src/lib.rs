//! rodline Server - HTTP authority for networked play
//!
//! This crate hosts one authoritative session:
//! - Seating for remote peers (two players, any number of spectators)
//! - Placement requests, answered in arrival order
//! - Long-poll delta stream with snapshot catch-up
//! - Static file serving for a browser client

mod routes;
mod state;

use axum::{
    routing::{get, post},
    Router,
};
use rodline_core::MatchConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

pub use state::ServerState;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: String,
    pub game: MatchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8002,
            static_dir: "web".to_string(),
            game: MatchConfig::versus(),
        }
    }
}

/// Create the router with all routes
pub fn create_router(config: &ServerConfig, state: Arc<ServerState>) -> Router {
    let static_service = ServeDir::new(&config.static_dir);

    Router::new()
        // Status endpoint
        .route("/api/status", get(routes::status::status_handler))
        // Session API
        .route("/api/session/join", post(routes::session::join_session))
        .route("/api/session/place", post(routes::session::place_piece))
        .route("/api/session/cancel", post(routes::session::cancel_request))
        .route("/api/session/leave", post(routes::session::leave_session))
        .route("/api/session/snapshot", get(routes::session::get_snapshot))
        .route("/api/session/poll", get(routes::session::poll_session))
        .route("/api/session/message", post(routes::session::handle_message))
        // Shared state
        .with_state(state)
        .layer(CorsLayer::permissive())
        // Static file serving (must be last)
        .fallback_service(static_service)
}

/// Start the HTTP server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(ServerState::new(config.game.clone())?);
    // AI-only sessions start moving without waiting for a peer
    ServerState::kick(&state);
    let router = create_router(&config, state);

    tracing::info!("rodline server starting on http://0.0.0.0:{}", config.port);
    tracing::info!("Static files served from: {}", config.static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
