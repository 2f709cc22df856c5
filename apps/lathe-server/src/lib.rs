//! # Lathe Server
//!
//! HTTP API for quoting: parts, line items, the pricing calculator and
//! quote totals.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Lathe Server                                    │
//! │                                                                         │
//! │  Quoting UI ───► axum (3000) ───► routes/* ───► lathe-db ───► SQLite    │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │                                 lathe-core                              │
//! │                          (pricing engine, rate table)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! `server.toml` plus environment overrides, see [`config`]:
//! - `LATHE_CONFIG` - Config file path
//! - `LATHE_BIND` / `LATHE_PORT` - Listener address
//! - `LATHE_DB_PATH` - SQLite file
//! - `RUST_LOG` - Log filter (default: `info,lathe=debug,sqlx=warn`)

use axum::Router;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::ServerConfig;
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

/// Builds the application with all routes.
pub fn app(state: AppState) -> Router {
    routes::router().with_state(state)
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins when set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lathe=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
