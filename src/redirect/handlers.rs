use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header::HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

use crate::clicks::ClickRecorder;
use crate::fingerprint;

use super::resolver::{RedirectResolver, Resolution};

pub struct RedirectState {
    pub resolver: RedirectResolver,
    pub recorder: Arc<ClickRecorder>,
}

/// Resolve a short code and redirect to its target URL.
///
/// The redirect response is issued immediately; click recording runs in a
/// spawned task whose failures are logged and swallowed, since the
/// redirect has already been decided.
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match state.resolver.resolve(&code).await {
        Ok(Resolution::Redirect(link)) => {
            let client = fingerprint::fingerprint(&headers, addr.ip());
            let recorder = Arc::clone(&state.recorder);
            let target = link.target_url.clone();

            tokio::spawn(async move {
                if let Err(err) = recorder.record(&link, client).await {
                    warn!(code = %link.code, error = %err, "failed to record click");
                }
            });

            Redirect::temporary(&target).into_response()
        }
        Ok(Resolution::NotFound) => (StatusCode::NOT_FOUND, "Short URL not found").into_response(),
        Ok(Resolution::Disabled) => {
            (StatusCode::GONE, "This link has been disabled").into_response()
        }
        Ok(Resolution::Expired) => (StatusCode::GONE, "This link has expired").into_response(),
        Err(err) => {
            warn!(code = %code, error = %err, "redirect lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
