//! Short-code resolution and the redirect hot path

mod handlers;
mod resolver;

pub use handlers::{redirect_url, RedirectState};
pub use resolver::{RedirectResolver, Resolution};

use axum::{routing::get, Router};
use std::sync::Arc;

pub fn create_redirect_router(state: Arc<RedirectState>) -> Router {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/{code}", get(handlers::redirect_url))
        .with_state(state)
}
