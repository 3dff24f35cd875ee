use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers::{events, images, media, scan, settings};
use crate::infra::app_state::AppState;

pub fn create_api_router() -> Router<AppState> {
    Router::new()
        // Library
        .route("/stats", get(media::stats_handler))
        .route("/media/{type}", get(media::list_media_handler))
        .route(
            "/media/{type}/{name}",
            get(media::media_detail_handler).delete(media::delete_artifacts_handler),
        )
        .route(
            "/media/{type}/{name}/file/{filename}",
            get(media::file_content_handler),
        )
        .route(
            "/media/{type}/{name}/regenerate",
            post(media::regenerate_handler),
        )
        .route(
            "/media/{type}/{name}/refresh-metadata",
            post(media::refresh_metadata_handler),
        )
        .route(
            "/media/{type}/{name}/override",
            put(media::set_override_handler).delete(media::remove_override_handler),
        )
        // Scan control
        .route("/scan", post(scan::trigger_scan_handler))
        .route("/scan/stop", post(scan::stop_scan_handler))
        .route("/status", get(scan::scan_status_handler))
        .route("/logs", get(scan::scan_logs_handler))
        .route("/events", get(events::scan_events_sse_handler))
        // Job settings
        .route(
            "/config",
            get(settings::get_settings_handler).put(settings::put_settings_handler),
        )
        .route("/images/tmdb/{*path}", get(images::tmdb_image_proxy_handler))
}
