/// Catalog Service Main Entry Point
///
/// Starts gRPC server with:
/// - In-memory record, rating and user stores
/// - Disk-backed image store
/// - JWT role enforcement on every call
use anyhow::{Context, Result};
use catalog_service::{build_router, config::Settings, AppState};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "catalog_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Catalog Service");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let state = AppState::from_settings(&settings)
        .await
        .context("Failed to initialize application state")?;
    info!(
        image_folder = %settings.images.folder,
        token_duration_secs = settings.jwt.token_duration_secs,
        "Stores initialized and users seeded"
    );

    let addr: SocketAddr = settings
        .server
        .address()
        .parse()
        .context("Invalid server address")?;

    info!("Starting gRPC server on {}", addr);

    build_router(&state)
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .context("gRPC server error")?;

    info!("Catalog service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
