// logsink/src/api/mod.rs
pub mod ingest;
pub mod system;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backup::BackupOrchestrator;
use crate::storage::Storage;

/// Shared handler state, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub orchestrator: Arc<BackupOrchestrator>,
    /// Single-flight guard for backup runs, shared with the scheduler.
    pub backup_gate: Arc<Mutex<()>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/logs", post(ingest::ingest_log))
        .route("/health", get(system::health))
        .route("/backup", post(system::trigger_backup))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
