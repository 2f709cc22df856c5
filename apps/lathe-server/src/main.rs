//! # Lathe Server
//!
//! ## Usage
//! ```bash
//! # Defaults, or ~/.config/lathe/server.toml when present
//! cargo run -p lathe-server
//!
//! # Explicit config file
//! cargo run -p lathe-server -- --config ./server.toml
//! ```

use std::env;
use std::path::PathBuf;

use lathe_db::{Database, DbConfig};
use lathe_server::{app, init_tracing, AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Lathe server...");

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.get(i + 1) {
                    config_path = Some(PathBuf::from(path));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Lathe quote pricing server");
                println!();
                println!("Usage: lathe-server [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => {
                error!(arg = %other, "Unknown argument");
                return Err(format!("unknown argument: {}", other).into());
            }
        }
        i += 1;
    }

    // Load configuration
    let config = ServerConfig::load(config_path)?;
    let database_path = config.database_path();
    info!(
        bind = %config.server.bind_address(),
        database = %database_path.display(),
        "Configuration loaded"
    );

    if let Some(parent) = database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Connect to database (runs migrations)
    let db = Database::new(
        DbConfig::new(database_path.clone()).max_connections(config.database.max_connections),
    )
    .await?;

    let state = AppState::new(db.clone(), config.rate_table());

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// A signal that can't be installed is logged and never fires.
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
