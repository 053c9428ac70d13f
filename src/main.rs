//! Bomb Party Server - Authoritative turn-based word game server
//!
//! This is the main entry point for the game server. It handles:
//! - WebSocket sessions for live play in game areas
//! - HTTP endpoints for area state, history and commands

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bomb_party_server::app::AppState;
use bomb_party_server::config::Config;
use bomb_party_server::game::{LengthScoring, MatchServices, TokioScheduler};
use bomb_party_server::http::build_router;
use bomb_party_server::util::time::init_server_time;
use bomb_party_server::wordlists;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Bomb Party Server");
    info!("Server address: {}", config.server_addr);

    // Load the dictionary once; every match shares it read-only
    let corpus = wordlists::load(
        config.dictionary_path.as_deref(),
        config.prompt_words_path.as_deref(),
    )?;

    let services = MatchServices {
        words: Arc::new(corpus),
        scheduler: Arc::new(TokioScheduler::new()),
        scoring: Arc::new(LengthScoring::default()),
    };

    // Create application state
    let state = AppState::new(config.clone(), services);

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws?area=<id>&player=<id>", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
