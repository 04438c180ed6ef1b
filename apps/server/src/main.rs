//! # Tally Server
//!
//! REST API over the statement ledger, with the daily reconciliation
//! scheduler running in the same process.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tracing ─► TallyConfig ─► Database (migrations) ─► SyncOrchestrator    │
//! │                                                          │              │
//! │                                  ┌───────────────────────┼──────────┐   │
//! │                                  ▼                       ▼          │   │
//! │                         Scheduler (05:00/17:00)   axum on :8080     │   │
//! │                                                                     │   │
//! │  Ctrl+C / SIGTERM ─► stop accepting ─► stop scheduler ─► drain      │   │
//! │                      background reconciliations ─► close pool ◄─────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```text
//! tally-server [--config <path>]
//! ```

use std::path::PathBuf;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tally_db::{Database, DbConfig};
use tally_server::{router, AppState};
use tally_sync::{Scheduler, TallyConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tally=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Tally server...");

    // Load configuration
    let config = TallyConfig::load(config_path_from_args())?;
    info!(
        addr = %config.server.bind_address(),
        db = %config.database.path.display(),
        schedule = ?config.sync.schedule,
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let db = Database::new(
        DbConfig::new(config.database.path.clone()).max_connections(config.database.max_connections),
    )
    .await
    .context("failed to open database")?;

    let state = AppState::new(db.clone(), config.sync.max_concurrent_reconciles);

    // Daily reconciliation
    let scheduler = if config.sync.enabled {
        let (scheduler, handle) =
            Scheduler::new(state.orchestrator.clone(), config.sync.schedule_times()?);
        Some((tokio::spawn(scheduler.run()), handle))
    } else {
        warn!("Scheduled reconciliation disabled");
        None
    };

    let listener = TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address()))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((task, handle)) = scheduler {
        if let Err(e) = handle.shutdown().await {
            warn!(error = %e, "Scheduler already stopped");
        }
        let _ = task.await;
    }

    state.orchestrator.shutdown().await;
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// `--config <path>`, if given.
fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next().map(PathBuf::from);
        }
    }
    None
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
