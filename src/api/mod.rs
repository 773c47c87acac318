//! JSON API surface consumed by dashboards and CLI tooling

mod handlers;

pub use handlers::AppState;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use handlers::{
    create_link, dashboard, delete_link, get_link, health_check, link_report, list_links,
    update_link,
};

pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/links", post(create_link))
        .route("/api/links", get(list_links))
        .route("/api/links/{code}", get(get_link))
        .route("/api/links/{code}", patch(update_link))
        .route("/api/links/{code}", delete(delete_link))
        .route("/api/links/{code}/stats", get(link_report))
        .route("/api/stats", get(dashboard))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
