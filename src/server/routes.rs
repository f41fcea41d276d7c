//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Triage page data and actions
        .route("/api/inbox", get(handlers::api_inbox))
        .route("/api/tag", post(handlers::api_tag))
        .route("/api/done", post(handlers::api_done))
        .route("/api/apply-tagset", post(handlers::api_apply_tagset))
        .route("/api/undo", post(handlers::api_undo))
        .route("/api/toggle-tag", post(handlers::api_toggle_tag))
        .route("/api/create-tag", post(handlers::api_create_tag))
        .route("/api/about", get(handlers::api_about))
        // Background work polling
        .route("/api/stage/:doc_id", get(handlers::api_stage))
        // Thumbnails
        .route("/proxy/thumbnail/:doc_id", get(handlers::proxy_thumbnail))
        .route("/hires/thumbnail/:doc_id", get(handlers::hires_thumbnail))
        .route(
            "/hires/thumbnail-ready/:doc_id",
            get(handlers::hires_thumbnail_ready),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
