pub mod events;
pub mod images;
pub mod media;
pub mod scan;
pub mod settings;

use axum::response::Json;
use serde_json::{Value, json};

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
