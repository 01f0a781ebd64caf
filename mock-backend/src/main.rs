//! PhishGuard Mock Backend
//!
//! Standalone development server for the PhishGuard client. Routes are
//! mounted under `MOCK_ROUTE_PREFIX` (default `/v1`) so the client's default
//! base URL `http://127.0.0.1:5000/v1` works out of the box.

use std::net::SocketAddr;

use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phishguard_mock::{create_router, AppState, Config};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "phishguard_mock=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("PhishGuard mock backend starting...");
    tracing::info!("Auth required: {}", config.require_auth);

    let state = AppState::new(config.clone());
    let app = if config.route_prefix.is_empty() || config.route_prefix == "/" {
        create_router(state)
    } else {
        Router::new().nest(&config.route_prefix, create_router(state))
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Mock backend listening on http://{}{}", addr, config.route_prefix);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
