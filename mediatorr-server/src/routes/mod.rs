pub mod api;

use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::handlers::health_handler;
use crate::infra::app_state::AppState;

/// Full application: `/api`, `/health`, and the web UI as fallback when a
/// static directory is configured.
pub fn create_app(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    let mut router = Router::new()
        .nest("/api", api::create_api_router())
        .route("/health", axum::routing::get(health_handler));

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
