//! Inbox page data and tagging actions.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::super::AppState;
use crate::store::TagId;
use crate::triage::InboxError;

/// Body of tag actions on the current document.
#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub ulid: String,
    #[serde(default)]
    pub name: String,
    /// Shortcut key.
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub struct DoneRequest {
    #[serde(default)]
    pub ulid: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplyTagSetRequest {
    pub ulid: String,
    #[serde(default)]
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct ToggleTagRequest {
    pub ulid: String,
    pub tag_id: TagId,
    /// Current state: true removes the tag, false adds it.
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: Option<String>,
    pub group: Option<String>,
    /// Also apply the new tag to this document.
    pub ulid: Option<String>,
}

/// Page data for the oldest untagged document.
pub async fn api_inbox(State(state): State<AppState>) -> Result<impl IntoResponse, InboxError> {
    Ok(Json(state.inbox.view().await?))
}

pub async fn api_tag(
    State(state): State<AppState>,
    Json(req): Json<TagRequest>,
) -> Result<impl IntoResponse, InboxError> {
    let flash = state.inbox.tag(&req.ulid, &req.name, &req.tag).await?;
    Ok(Json(serde_json::json!({ "flash": flash })))
}

pub async fn api_done(
    State(state): State<AppState>,
    Json(req): Json<DoneRequest>,
) -> impl IntoResponse {
    state.inbox.done(&req.ulid).await;
    Json(serde_json::json!({ "ok": true }))
}

pub async fn api_apply_tagset(
    State(state): State<AppState>,
    Json(req): Json<ApplyTagSetRequest>,
) -> Result<impl IntoResponse, InboxError> {
    let flash = state
        .inbox
        .apply_tag_set(req.index, &req.ulid, &req.name)
        .await?;
    Ok(Json(serde_json::json!({ "flash": flash })))
}

pub async fn api_undo(State(state): State<AppState>) -> Result<impl IntoResponse, InboxError> {
    let flash = state.inbox.undo().await?;
    Ok(Json(serde_json::json!({ "flash": flash })))
}

pub async fn api_toggle_tag(
    State(state): State<AppState>,
    Json(req): Json<ToggleTagRequest>,
) -> Result<impl IntoResponse, InboxError> {
    let active = state
        .inbox
        .toggle_tag(&req.ulid, req.tag_id, req.active)
        .await?;
    Ok(Json(serde_json::json!({ "active": active })))
}

pub async fn api_create_tag(
    State(state): State<AppState>,
    Json(req): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, InboxError> {
    let created = state
        .inbox
        .create_tag(
            &req.name,
            req.color.as_deref(),
            req.group.as_deref(),
            req.ulid.as_deref(),
        )
        .await?;
    Ok(Json(created))
}

/// Config source and the server's tags.
pub async fn api_about(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.inbox.about())
}

/// Enrichment stage of a document, for polling.
pub async fn api_stage(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> impl IntoResponse {
    let stage = state.inbox.stage(&doc_id);
    Json(serde_json::json!({
        "stage": stage.as_str(),
        "running": stage.is_running(),
        "date_inferred": state.inbox.date_is_inferred(&doc_id),
    }))
}
