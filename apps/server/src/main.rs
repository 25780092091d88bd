//! # bodega-server
//!
//! HTTP front for the Bodega sale engine. Owns the listener and graceful
//! shutdown; everything interesting happens in the library crates.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bodega_db::{Database, DbConfig};

mod config;
mod error;
mod routes;
mod state;

use config::ServerConfig;
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    info!(db_path = %config.db_path, bind_addr = %config.bind_addr, "Starting bodega-server");

    let db = match Database::new(DbConfig::new(&config.db_path)).await {
        Ok(db) => db,
        Err(err) => {
            error!(error = %err, "Failed to open database");
            std::process::exit(1);
        }
    };

    let app = routes::router(AppState::new(db.clone()));

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, addr = %config.bind_addr, "Failed to bind listener");
            std::process::exit(1);
        }
    };

    info!(addr = %config.bind_addr, "Listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %err, "Server error");
    }

    db.close().await;
    info!("Shutdown complete");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to install ctrl-c handler");
    }
    info!("Shutdown signal received");
}
