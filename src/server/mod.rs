//! Web server for keyboard-driven triage.
//!
//! Exposes the inbox as a JSON API:
//! - Current document with tag groups, recent tag sets and undo state
//! - Tagging, tag-set reapplication, undo, tag toggling and creation
//! - Polling endpoints for enrichment stage and hi-res previews
//! - Same-origin relay of the store's thumbnails

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use crate::config::Settings;
use crate::llm::OllamaClient;
use crate::ocr::TesseractExtractor;
use crate::store::DocumentStore;
use crate::thumbnail::ImageRenderer;
use crate::triage::Inbox;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub inbox: Arc<Inbox>,
}

impl AppState {
    pub fn new(inbox: Arc<Inbox>) -> Self {
        Self { inbox }
    }

    /// Build the inbox over `store` with the production OCR, inference and
    /// rendering collaborators, and load the tag catalog.
    pub async fn with_store(
        settings: &Settings,
        store: Arc<dyn DocumentStore>,
    ) -> anyhow::Result<Self> {
        let extractor = TesseractExtractor::new().with_timeout(settings.ocr_timeout);
        let inference = OllamaClient::new().context("Failed to create inference client")?;

        let inbox = Inbox::start(
            settings,
            store,
            Arc::new(extractor),
            Arc::new(inference),
            Arc::new(ImageRenderer::new()),
        );
        inbox
            .refresh_tags()
            .await
            .context("Failed to load tags from godocs")?;

        Ok(Self::new(Arc::new(inbox)))
    }
}

/// Start the web server.
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", addr))?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
