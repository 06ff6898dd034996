//! Ensemble agent entry point
//!
//! Builds an ensemble connection from a JSON settings file, serves the admin
//! health endpoint, and keeps the connection open until shutdown.

use std::net::SocketAddr;

use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use connection_factory::{admin, ConnectionFactory};
use ensemble_core::ConnectionSettings;
use host::Environment;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "connection_factory=info,ensemble_client=info,host=info,ensemble_agent=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);

    // Settings file from args, defaults otherwise
    let settings = match args.next() {
        Some(path) => {
            info!(path = %path, "Loading connection settings");
            ConnectionSettings::load(&path)?
        }
        None => {
            info!("No settings file given, using defaults");
            ConnectionSettings::default()
        }
    };
    let config = settings.into_config()?;

    let admin_addr: SocketAddr = match args.next() {
        Some(addr) => addr.parse()?,
        None => SocketAddr::from(([0, 0, 0, 0], 8081)),
    };

    let (environment, lifecycle, health) = Environment::standalone();
    let client = ConnectionFactory::new(environment).build(&config)?;
    info!(client = ?client, "Ensemble client built");

    let listener = tokio::net::TcpListener::bind(admin_addr).await?;
    info!(address = %admin_addr, "Admin API listening");
    let admin_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, admin::router(health)).await {
            tracing::error!(error = %e, "Admin server error");
        }
    });

    lifecycle.start_all().await?;

    shutdown_signal().await;

    lifecycle.stop_all().await?;
    admin_handle.abort();
    info!("Ensemble agent shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
