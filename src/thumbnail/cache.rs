//! On-disk cache of hi-res previews.
//!
//! The presence of `<dir>/<doc_id>.png` is the whole record. Previews are
//! rendered into a hidden temp file in the same directory and renamed into
//! place, so a reader never sees a partially written preview. Concurrent
//! generations for one document are tolerated: both render, the last
//! rename wins, and either result is complete.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ThumbnailError, ThumbnailRenderer, ThumbnailStyle};
use crate::store::DocumentStore;
use crate::utils::scratch_extension;

/// Width of generated previews in pixels.
pub const PREVIEW_WIDTH: u32 = 600;

/// What a generation attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    /// A complete preview already existed.
    AlreadyCached,
    Generated,
}

pub struct ThumbnailCache {
    dir: PathBuf,
    scratch_dir: PathBuf,
    store: Arc<dyn DocumentStore>,
    renderer: Arc<dyn ThumbnailRenderer>,
    width: u32,
    style: ThumbnailStyle,
}

impl ThumbnailCache {
    pub fn new(
        dir: PathBuf,
        scratch_dir: PathBuf,
        store: Arc<dyn DocumentStore>,
        renderer: Arc<dyn ThumbnailRenderer>,
    ) -> Self {
        Self {
            dir,
            scratch_dir,
            store,
            renderer,
            width: PREVIEW_WIDTH,
            style: ThumbnailStyle::Uniform,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic cache path for a document.
    pub fn path(&self, doc_id: &str) -> PathBuf {
        self.dir.join(format!("{}.png", cache_key(doc_id)))
    }

    /// Whether a complete preview exists.
    pub fn exists(&self, doc_id: &str) -> bool {
        self.path(doc_id).is_file()
    }

    /// Polling alias of [`exists`](Self::exists).
    pub fn ready(&self, doc_id: &str) -> bool {
        self.exists(doc_id)
    }

    /// Generate the preview for `doc_id` if missing, logging any failure.
    ///
    /// Failures leave nothing behind; a later page view tries again.
    pub async fn generate(&self, doc_id: &str, doc_type: &str) -> bool {
        match self.try_generate(doc_id, doc_type).await {
            Ok(ThumbnailOutcome::Generated) => {
                info!("Generated hi-res preview for {}", doc_id);
                true
            }
            Ok(ThumbnailOutcome::AlreadyCached) => true,
            Err(e) => {
                warn!("Hi-res preview failed for {}: {}", doc_id, e);
                false
            }
        }
    }

    /// Generate the preview for `doc_id` if missing.
    pub async fn try_generate(
        &self,
        doc_id: &str,
        doc_type: &str,
    ) -> Result<ThumbnailOutcome, ThumbnailError> {
        // Cheap guard, not a lock: duplicate work is harmless
        if self.exists(doc_id) {
            return Ok(ThumbnailOutcome::AlreadyCached);
        }

        let content = self.store.download(doc_id).await?;

        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let extension = scratch_extension(doc_type, &content.content_type);
        let mut scratch = tempfile::Builder::new()
            .prefix("docinbox-thumb-")
            .suffix(&extension)
            .tempfile_in(&self.scratch_dir)?;
        scratch.write_all(&content.bytes)?;
        scratch.flush()?;

        let staging = tempfile::Builder::new()
            .prefix(".")
            .suffix(".png.part")
            .tempfile_in(&self.dir)?;

        let renderer = Arc::clone(&self.renderer);
        let source = scratch.path().to_path_buf();
        let dest = staging.path().to_path_buf();
        let (width, style) = (self.width, self.style);
        debug!("Rendering preview for {} from {}", doc_id, source.display());
        tokio::task::spawn_blocking(move || renderer.render(&source, &dest, width, style))
            .await
            .map_err(|e| ThumbnailError::Render(format!("render task failed: {}", e)))??;

        staging
            .persist(self.path(doc_id))
            .map_err(|e| ThumbnailError::Io(e.error))?;

        Ok(ThumbnailOutcome::Generated)
    }
}

/// File-name-safe form of a document id.
///
/// ASCII letters, digits and `-` pass through, so a ULID is its own key.
/// `_` becomes `__` and every other byte becomes `_` plus two hex digits,
/// which keeps distinct ids on distinct files.
fn cache_key(doc_id: &str) -> String {
    let mut key = String::with_capacity(doc_id.len());
    for byte in doc_id.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' => key.push(byte as char),
            b'_' => key.push_str("__"),
            other => key.push_str(&format!("_{:02x}", other)),
        }
    }
    key
}
