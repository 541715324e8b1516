//! # Stockbook API
//!
//! JSON HTTP server for the shop ledger.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Load configuration (defaults → stockbook.toml → STOCKBOOK_* env)   │
//! │  2. Initialize logging (RUST_LOG, else [log].filter)                   │
//! │  3. Open SQLite (WAL, foreign keys, busy timeout) + run migrations     │
//! │  4. Bind the listener and serve until Ctrl+C / SIGTERM                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! stockbook-api --config ./stockbook.toml
//! STOCKBOOK_PORT=9000 STOCKBOOK_DB_PATH=./dev.db stockbook-api
//! ```

use std::path::PathBuf;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stockbook_api::{router, AppConfig, AppState};
use stockbook_db::Database;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path_arg())?;

    init_tracing(&config.log.filter);

    info!("Starting Stockbook API server...");
    info!(
        addr = %config.server.bind_address(),
        db_path = %config.database.path.display(),
        "Configuration loaded"
    );

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(config.db_config()).await?;
    info!("Database connected and migrations applied");

    let app = router(AppState::new(db.clone()));

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    info!(addr = %config.server.bind_address(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Reads `--config <path>` from the command line.
fn config_path_arg() -> Option<PathBuf> {
    std::env::args()
        .skip_while(|arg| arg != "--config" && arg != "-c")
        .nth(1)
        .map(PathBuf::from)
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stockbook=trace` - Show trace for stockbook crates only
/// - Default: the configured filter
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(?e, "Failed to install Ctrl+C handler");
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
                warn!(?e, "Failed to install SIGTERM handler");
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
