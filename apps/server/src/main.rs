//! # Toolcrib Server
//!
//! Serves the tool ledger over HTTP and pushes change topics over `/ws`.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ServerConfig::load ──▶ tracing ──▶ Database::new (migrations)          │
//! │                                          │                              │
//! │                                          ▼                              │
//! │               AppState { Ledger, BroadcastNotifier }                    │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                axum::serve ... until Ctrl-C / SIGTERM                   │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                   pool closed                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use toolcrib_db::{Database, DbConfig};
use toolcrib_ledger::BroadcastNotifier;
use toolcrib_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Toolcrib server...");
    info!(
        addr = %config.bind_address(),
        db = %config.database_path.display(),
        "Configuration loaded"
    );

    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let db = Database::new(
        DbConfig::new(&config.database_path)
            .max_connections(config.max_connections)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms)),
    )
    .await
    .context("Failed to open database")?;
    info!("Database ready");

    let notifier = BroadcastNotifier::new(config.notifier_capacity);
    let state = AppState::new(Arc::new(db.clone()), notifier, config.history_limit);
    let app = router(state);

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address()))?;
    info!(addr = %config.bind_address(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
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
