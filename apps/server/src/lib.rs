//! # Toolcrib Server
//!
//! HTTP + WebSocket front end of the tool ledger.
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            Server Routes                                │
//! │                                                                         │
//! │  ┌──────────────────────┐  ┌──────────────────────┐  ┌───────────────┐ │
//! │  │  /api/items          │  │  /api/loans          │  │ /api/history  │ │
//! │  │                      │  │                      │  │               │ │
//! │  │ • GET    list        │  │ • GET  ?status=      │  │ • GET ?limit= │ │
//! │  │ • POST   create      │  │ • POST checkout      │  │               │ │
//! │  │ • GET    /{id}       │  │ • GET  /{id}         │  └───────────────┘ │
//! │  │ • PUT    /{id} edit  │  │ • PUT  /{id}/return  │                    │
//! │  │ • DELETE /{id}       │  │                      │  ┌───────────────┐ │
//! │  └──────────────────────┘  └──────────────────────┘  │ /ws  /health  │ │
//! │                                                      └───────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config`] for the TOML file):
//! - `HOST` / `PORT` - bind address (default: `0.0.0.0:3000`)
//! - `TOOLCRIB_DB` - SQLite file (default: platform data dir)
//! - `TOOLCRIB_DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `TOOLCRIB_HISTORY_LIMIT` - default history page (default: 100)
//! - `TOOLCRIB_NOTIFIER_CAPACITY` - WebSocket lag budget (default: 256)
//! - `RUST_LOG` - log filter (default: `info`)

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::items::routes())
        .merge(routes::loans::routes())
        .merge(routes::history::routes());

    Router::new()
        .nest("/api", api)
        .route("/ws", get(routes::ws::ws_handler))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        // Mobile clients connect from arbitrary origins
        .layer(CorsLayer::permissive())
        .with_state(state)
}
