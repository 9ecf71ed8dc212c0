//! Log sink service entry point.
//!
//! Wires configuration, storage, the backup scheduler and the HTTP listener
//! together, then serves until the process is stopped.

// logsink/src/main.rs
use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use logsink::api::{self, AppState};
use logsink::backup::BackupOrchestrator;
use logsink::config::AppConfig;
use logsink::schedule;
use logsink::storage::Storage;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ fatal: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration from environment")?;
    info!(backend = %config.storage.kind, "🚀 starting logsink");

    // The listener does not open until the backend is reachable.
    let storage = Arc::new(Storage::new(config.storage.clone()));
    storage
        .initialize()
        .await
        .context("storage initialization failed")?;

    let orchestrator = Arc::new(BackupOrchestrator::new(&config).await);
    let backup_gate = Arc::new(Mutex::new(()));
    if config.backup.enabled {
        schedule::spawn(
            &config.backup.schedule,
            Arc::clone(&orchestrator),
            Arc::clone(&backup_gate),
        );
    } else {
        info!("backups disabled; scheduler not started");
    }

    let app = api::router(AppState {
        storage,
        orchestrator,
        backup_gate,
    });
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "✅ listening for log ingestion");
    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;
    Ok(())
}
