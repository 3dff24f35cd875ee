use axum::{extract::State, response::Json};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub status: &'static str,
}

pub async fn get_settings_handler(State(state): State<AppState>) -> Json<Map<String, Value>> {
    Json(state.settings.load_masked().await)
}

pub async fn put_settings_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<Json<SavedResponse>> {
    let Value::Object(settings) = body else {
        return Err(AppError::bad_request("Settings must be a JSON object"));
    };

    state.settings.save(settings).await.map_err(|e| {
        error!(path = %state.settings.path().display(), error = %e, "failed to save job settings");
        AppError::internal("Failed to save config")
    })?;

    info!("job settings saved");
    Ok(Json(SavedResponse {
        status: "Config saved",
    }))
}
