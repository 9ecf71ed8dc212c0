// logsink/src/api/ingest.rs
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use super::AppState;
use crate::storage::record::LogRecord;

/// Accepts one log entry and acknowledges immediately. The write happens in
/// the background; callers always get a success response, including when the
/// backend later rejects the record. Producers must never block or fail on
/// logging.
pub async fn ingest_log(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    let record = LogRecord::from_ingest(&body, Utc::now());
    debug!(shape = %record.shape, "ingesting log record");
    state.storage.insert(record);
    Json(json!({ "success": true }))
}
