use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Json},
};
use mediatorr_core::library::catalog::DEFAULT_PER_PAGE;
use mediatorr_core::library::{LibraryStats, ListQuery, MediaDetail, MediaPage, SortOrder};
use mediatorr_core::overrides::{OverrideRepository, OverrideView};
use mediatorr_core::scan::ScanControlError;
use mediatorr_core::{MediaKey, MediaType};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl ListParams {
    /// Lenient parsing: values that are not integers fall back to the
    /// default and values below 1 are raised to 1.
    fn into_query(self) -> ListQuery {
        let positive = |raw: Option<String>, default: usize| {
            raw.and_then(|value| value.trim().parse::<i64>().ok())
                .map(|value| usize::try_from(value.max(1)).unwrap_or(usize::MAX))
                .unwrap_or(default)
        };

        ListQuery {
            search: self.search.unwrap_or_default(),
            sort: self
                .sort
                .as_deref()
                .map(SortOrder::parse_or_default)
                .unwrap_or_default(),
            page: positive(self.page, 1),
            per_page: positive(self.per_page, DEFAULT_PER_PAGE),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub status: &'static str,
    pub deleted: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    pub id: i64,
    pub api_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OverrideResponse {
    #[serde(rename = "override")]
    pub override_: OverrideView,
    /// `started` when a rescan was launched, `pending` when one was
    /// already running and will pick the override up.
    pub scan: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OverrideRemovedResponse {
    pub removed: bool,
}

pub(crate) fn parse_media_type(raw: &str) -> AppResult<MediaType> {
    raw.parse()
        .map_err(|_| AppError::bad_request("Invalid media type"))
}

fn parse_key(media_type: &str, name: String) -> AppResult<MediaKey> {
    let media_type = parse_media_type(media_type)?;
    MediaKey::new(media_type, name).map_err(|_| AppError::bad_request("Invalid name"))
}

pub async fn stats_handler(State(state): State<AppState>) -> AppResult<Json<LibraryStats>> {
    let catalog = state.catalog.clone();
    let stats = tokio::task::spawn_blocking(move || catalog.stats()).await?;
    Ok(Json(stats))
}

pub async fn list_media_handler(
    State(state): State<AppState>,
    Path(media_type): Path<String>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<MediaPage>> {
    let media_type = parse_media_type(&media_type)?;
    let query = params.into_query();
    let catalog = state.catalog.clone();
    let page =
        tokio::task::spawn_blocking(move || catalog.list(media_type, &query)).await?;
    Ok(Json(page))
}

pub async fn media_detail_handler(
    State(state): State<AppState>,
    Path((media_type, name)): Path<(String, String)>,
) -> AppResult<Json<MediaDetail>> {
    let key = parse_key(&media_type, name)?;
    state
        .catalog
        .detail(&key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Media item not found"))
}

pub async fn file_content_handler(
    State(state): State<AppState>,
    Path((media_type, name, filename)): Path<(String, String, String)>,
) -> AppResult<impl IntoResponse> {
    let media_type = parse_media_type(&media_type)?;
    let catalog = state.catalog.clone();
    let content = tokio::task::spawn_blocking(move || {
        catalog.file_content(media_type, &name, &filename)
    })
    .await?
    .ok_or_else(|| AppError::not_found("File not found"))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        content,
    ))
}

#[instrument(skip(state))]
pub async fn regenerate_handler(
    State(state): State<AppState>,
    Path((media_type, name)): Path<(String, String)>,
) -> AppResult<Json<RegenerateResponse>> {
    let key = parse_key(&media_type, name)?;
    let catalog = state.catalog.clone();
    let deleted =
        tokio::task::spawn_blocking(move || catalog.delete_artifacts(&key)).await?;

    state.scan.trigger()?;
    info!(deleted, "regeneration triggered");
    Ok(Json(RegenerateResponse {
        status: "Regeneration triggered",
        deleted,
    }))
}

#[instrument(skip(state))]
pub async fn refresh_metadata_handler(
    State(state): State<AppState>,
    Path((media_type, name)): Path<(String, String)>,
) -> AppResult<Json<RegenerateResponse>> {
    let key = parse_key(&media_type, name)?;
    let catalog = state.catalog.clone();
    let deleted = tokio::task::spawn_blocking(move || {
        catalog.delete_metadata_artifacts(&key)
    })
    .await?;

    state.scan.trigger()?;
    info!(deleted, "metadata refresh triggered");
    Ok(Json(RegenerateResponse {
        status: "Metadata refresh triggered",
        deleted,
    }))
}

pub async fn delete_artifacts_handler(
    State(state): State<AppState>,
    Path((media_type, name)): Path<(String, String)>,
) -> AppResult<Json<DeletedResponse>> {
    let key = parse_key(&media_type, name)?;
    let catalog = state.catalog.clone();
    let deleted =
        tokio::task::spawn_blocking(move || catalog.delete_artifacts(&key)).await?;
    Ok(Json(DeletedResponse { deleted }))
}

/// Store an override, drop the metadata it invalidates, and rescan.
#[instrument(skip(state, request))]
pub async fn set_override_handler(
    State(state): State<AppState>,
    Path((media_type, name)): Path<(String, String)>,
    Json(request): Json<OverrideRequest>,
) -> AppResult<Json<OverrideResponse>> {
    let key = parse_key(&media_type, name)?;
    if !key.media_type().supports_overrides() {
        return Err(AppError::bad_request(
            "Overrides are only supported for films and series",
        ));
    }
    if request.id <= 0 {
        return Err(AppError::bad_request("Override id must be positive"));
    }

    let api_type = request.api_type.unwrap_or_else(|| match key.media_type() {
        MediaType::Series => "tv".to_string(),
        _ => "movie".to_string(),
    });
    let stored = state
        .catalog
        .overrides()
        .set(&key, request.id, &api_type)
        .await?;

    let catalog = state.catalog.clone();
    let owned_key = key.clone();
    tokio::task::spawn_blocking(move || catalog.delete_metadata_artifacts(&owned_key))
        .await?;

    let scan = match state.scan.trigger() {
        Ok(_) => "started",
        Err(ScanControlError::AlreadyRunning) => "pending",
        Err(err) => return Err(err.into()),
    };

    info!(id = stored.api_id_override, api_type = %stored.api_type, scan, "override stored");
    Ok(Json(OverrideResponse {
        override_: OverrideView::from(&stored),
        scan,
    }))
}

pub async fn remove_override_handler(
    State(state): State<AppState>,
    Path((media_type, name)): Path<(String, String)>,
) -> AppResult<Json<OverrideRemovedResponse>> {
    let key = parse_key(&media_type, name)?;
    if !key.media_type().supports_overrides() {
        return Err(AppError::bad_request(
            "Overrides are only supported for films and series",
        ));
    }
    let removed = state.catalog.overrides().remove(&key).await?;
    Ok(Json(OverrideRemovedResponse { removed }))
}
