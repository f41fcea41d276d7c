//! HTTP request handlers for the web server.

mod actions;
mod thumbnails;

pub use actions::{
    api_about, api_apply_tagset, api_create_tag, api_done, api_inbox, api_stage, api_tag,
    api_toggle_tag, api_undo,
};
pub use thumbnails::{hires_thumbnail, hires_thumbnail_ready, proxy_thumbnail};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::triage::InboxError;

impl IntoResponse for InboxError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
