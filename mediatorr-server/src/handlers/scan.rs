use axum::{extract::State, response::Json};
use mediatorr_core::LogEntry;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::infra::app_state::AppState;
use crate::infra::errors::AppResult;

#[derive(Debug, Serialize)]
pub struct ScanControlResponse {
    pub status: &'static str,
}

pub async fn trigger_scan_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ScanControlResponse>> {
    let started = state.scan.trigger()?;
    info!(pid = ?started.pid, "scan triggered over http");
    Ok(Json(ScanControlResponse { status: "started" }))
}

pub async fn stop_scan_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ScanControlResponse>> {
    let stopped = state.scan.stop().await?;
    info!(pid = ?stopped.pid, "scan stop requested over http");
    Ok(Json(ScanControlResponse { status: "stopping" }))
}

pub async fn scan_status_handler(State(state): State<AppState>) -> Json<Value> {
    Json(status_payload(&state).await)
}

pub async fn scan_logs_handler(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.events.log_buffer())
}

/// Last known status file contents with the live `running` flag of the
/// supervised process merged in.
pub(crate) async fn status_payload(state: &AppState) -> Value {
    let status = state.watcher.last_status().await;
    let mut value = serde_json::to_value(&status).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut value {
        map.insert("running".to_string(), Value::Bool(state.scan.is_running()));
    }
    value
}
