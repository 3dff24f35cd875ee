use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use tracing::{debug, warn};

use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";
const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

/// Stream a TMDb image through this server so browsers never talk to the
/// CDN directly.
pub async fn tmdb_image_proxy_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> AppResult<Response> {
    let path = path.trim_start_matches('/');
    if path.is_empty() || path.contains("..") {
        return Err(AppError::bad_request("Invalid image path"));
    }

    let url = format!("{}{}", state.image_base_url, path);
    let upstream = match state.http.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => resp,
        Ok(resp) => {
            debug!(%url, status = %resp.status(), "upstream image unavailable");
            return Err(AppError::not_found("Image not found"));
        }
        Err(e) => {
            warn!(%url, error = %e, "image proxy request failed");
            return Err(AppError::not_found("Image not found"));
        }
    };

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_IMAGE_TYPE)
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, IMAGE_CACHE_CONTROL)
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| AppError::internal(format!("Failed to build image response: {e}")))
}
