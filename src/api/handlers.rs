use axum::{
    extract::{Path, Query, State},
    http::{header::HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::analytics::{AnalyticsService, Dashboard, LinkReport};
use crate::error::ServiceError;
use crate::links::LinkService;
use crate::models::{Link, LinkFilter, LinkUpdate};

pub struct AppState {
    pub links: LinkService,
    pub analytics: AnalyticsService,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Deserialize)]
pub struct CreateLinkRequest {
    pub target_url: String,
    pub custom_alias: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    pub expires_at: Option<i64>,
}

fn default_public() -> bool {
    true
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: LinkFilter,
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Deserialize)]
pub struct ReportQuery {
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_top")]
    pub limit: i64,
}

fn default_days() -> u32 {
    30
}

fn default_top() -> i64 {
    10
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Authentication is an external collaborator; the account reference
/// arrives as an opaque header set by the layer in front of us.
fn owner_from(headers: &HeaderMap) -> String {
    headers
        .get("x-account-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

fn error_response(err: ServiceError) -> ApiError {
    let status = match &err {
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::Conflict => StatusCode::CONFLICT,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::CodeSpaceExhausted(_) | ServiceError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "request failed");
        "internal server error".to_string()
    } else {
        err.to_string()
    };

    (status, Json(ErrorResponse { error: message }))
}

/// Create a new shortened link
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<Link>), ApiError> {
    let owner = owner_from(&headers);

    let link = state
        .links
        .create(
            &owner,
            &payload.target_url,
            payload.custom_alias.as_deref(),
            payload.is_public,
            payload.expires_at,
        )
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(link)))
}

/// List the caller's links with filtering and search
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Link>>, ApiError> {
    let owner = owner_from(&headers);
    let limit = query.limit.clamp(1, 500);

    let links = state
        .links
        .list(
            &owner,
            query.filter,
            query.search.as_deref(),
            limit,
            query.offset.max(0),
        )
        .await
        .map_err(error_response)?;

    Ok(Json(links))
}

/// Get one of the caller's links by code
pub async fn get_link(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Result<Json<Link>, ApiError> {
    let owner = owner_from(&headers);
    let link = state
        .links
        .get_owned(&code, &owner)
        .await
        .map_err(error_response)?;

    Ok(Json(link))
}

/// Update target/active/expiry/visibility; the code is immutable
pub async fn update_link(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
    Json(changes): Json<LinkUpdate>,
) -> Result<Json<Link>, ApiError> {
    let owner = owner_from(&headers);
    let link = state
        .links
        .update(&code, &owner, &changes)
        .await
        .map_err(error_response)?;

    Ok(Json(link))
}

/// Delete a link and its click history
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let owner = owner_from(&headers);
    state
        .links
        .delete(&code, &owner)
        .await
        .map_err(error_response)?;

    Ok(Json(SuccessResponse {
        message: "link deleted".to_string(),
    }))
}

/// Windowed analytics report for one link
pub async fn link_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<LinkReport>, ApiError> {
    let owner = owner_from(&headers);
    let link = state
        .links
        .get_owned(&code, &owner)
        .await
        .map_err(error_response)?;

    let report = state
        .analytics
        .link_report(&link, query.days.clamp(1, 365), query.limit.clamp(1, 100))
        .await
        .map_err(|e| error_response(ServiceError::Storage(e)))?;

    Ok(Json(report))
}

/// Account-wide analytics dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Dashboard>, ApiError> {
    let owner = owner_from(&headers);
    let dashboard = state
        .analytics
        .dashboard(&owner)
        .await
        .map_err(|e| error_response(ServiceError::Storage(e)))?;

    Ok(Json(dashboard))
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
