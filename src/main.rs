mod api;
mod auth;
mod config;
mod error;
mod geo;
mod index_store;
mod media_store;
mod posts;
mod users;

use std::sync::Arc;

use anyhow::{Context, Result};
use api::AppState;
use auth::TokenIssuer;
use config::Config;
use index_store::IndexStore;
use media_store::MediaStore;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting geopost service"
    );

    // Initialize components; an unreachable index store aborts startup
    let index_store = Arc::new(
        IndexStore::new(&config.index).context("Failed to initialize index store")?,
    );
    index_store
        .ensure_indexes()
        .await
        .context("Failed to create search indexes")?;

    let media_store = Arc::new(
        MediaStore::new(&config.s3)
            .await
            .context("Failed to initialize media store")?,
    );

    let state = AppState::new(index_store, media_store, TokenIssuer::new(&config.auth));
    let router = api::create_router(state);

    let addr = format!("{}:{}", config.api.host, config.api.port);
    info!(address = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("Geopost service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
