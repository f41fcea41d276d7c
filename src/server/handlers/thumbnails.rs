//! Hi-res previews and proxied store thumbnails.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::super::AppState;
use crate::triage::InboxError;

/// Serve a cached preview, or 404 while it is not ready.
pub async fn hires_thumbnail(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Response {
    let Some(path) = state.inbox.thumbnail_path(&doc_id) else {
        return (StatusCode::NOT_FOUND, "Preview not found").into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(content) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "public, max-age=86400"),
            ],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Preview not found").into_response(),
    }
}

pub async fn hires_thumbnail_ready(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> impl IntoResponse {
    Json(serde_json::json!({ "ready": state.inbox.thumbnail_ready(&doc_id) }))
}

/// Relay the store's own thumbnail so the browser stays on one origin.
pub async fn proxy_thumbnail(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Response, InboxError> {
    let thumb = state.inbox.store_thumbnail(&doc_id).await?;
    let content_type = if thumb.content_type.is_empty() {
        "image/png".to_string()
    } else {
        thumb.content_type
    };
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        thumb.bytes,
    )
        .into_response())
}
