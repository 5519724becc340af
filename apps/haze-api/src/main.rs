//! # Haze API
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Haze API Server                                │
//! │                                                                         │
//! │  Browser / till ───► HTTP (8080) ───► Routes ───► SQLite (haze.db)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration comes from `haze.toml` and `HAZE_*` variables; see
//! [`haze_api::config`].

use anyhow::Context;
use haze_api::{bootstrap_admin, init_tracing, router, AppState, ServerConfig};
use haze_db::{Database, DbConfig};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Haze API server...");

    let config = ServerConfig::load().context("loading configuration")?;
    let addr = config.socket_addr()?;
    info!(
        %addr,
        database = %config.database_path,
        store = %config.store_name,
        "Configuration loaded"
    );

    if config.uses_dev_secret() {
        warn!("Using the built-in development JWT secret; set HAZE_JWT_SECRET in production");
    }

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.max_connections),
    )
    .await
    .with_context(|| format!("opening {}", config.database_path))?;
    info!("Database ready");

    let state = AppState::new(db.clone(), config);

    if let Some(admin) = bootstrap_admin(&state).await? {
        info!(email = %admin.email, "No users found, bootstrap admin created");
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
