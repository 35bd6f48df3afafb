//! # Tienda POS API
//!
//! HTTP server wiring: configuration, database, payment gateway,
//! settlement engine, axum router.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         tienda-api                                  │
//! │                                                                     │
//! │  POS clients ──► axum (8080) ──► SettlementEngine ──► SQLite        │
//! │                      ▲                  │                           │
//! │  QR provider ────────┘ (callback)       └──► HttpQrGateway ──► ☁    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use tienda_db::{Database, DbConfig};
use tienda_gateway::{GatewayConfig, HttpQrGateway};
use tienda_settlement::SettlementEngine;

use crate::config::ApiConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Tienda POS API...");

    let config = ApiConfig::load()?;
    info!(
        bind_addr = %config.bind_addr,
        database_path = %config.database_path,
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database ready");

    let gateway = Arc::new(HttpQrGateway::new(GatewayConfig::from_env()?)?);
    let engine = SettlementEngine::new(db.clone(), gateway, config.store.clone());

    let app = handlers::router(AppState { engine, db });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown on Ctrl+C or SIGTERM.
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
