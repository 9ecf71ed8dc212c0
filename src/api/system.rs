// logsink/src/api/system.rs
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::AppState;
use crate::config::BackendKind;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: String,
    backend: BackendKind,
    insert_failures: u64,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now().to_rfc3339(),
            backend: state.storage.backend(),
            insert_failures: state.storage.insert_failures(),
        }),
    )
}

/// Kicks off a backup run on demand. Returns 409 when a run is already in
/// flight (scheduled or manual) rather than queueing a second one.
pub async fn trigger_backup(State(state): State<AppState>) -> Response {
    let Ok(_guard) = state.backup_gate.try_lock() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "error": "a backup run is already in progress"
            })),
        )
            .into_response();
    };

    info!("manual backup trigger received");
    match state.orchestrator.run().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "phase": "failed",
                "error": format!("{e:#}")
            })),
        )
            .into_response(),
    }
}
