//! Hi-resolution preview generation and caching.
//!
//! The store's own thumbnails are small; previews here are rendered at a
//! fixed width and kept in an on-disk cache keyed by document id.

mod cache;
mod render;

pub use cache::{ThumbnailCache, ThumbnailOutcome, PREVIEW_WIDTH};
pub use render::ImageRenderer;

use std::path::Path;

use thiserror::Error;

use crate::store::StoreError;

/// Visual treatment applied after resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailStyle {
    /// Resized image only.
    Plain,
    /// Resized image on a white canvas with an even margin and a thin border.
    #[default]
    Uniform,
}

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("Download failed: {0}")]
    Download(#[from] StoreError),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders a preview image from a source document.
///
/// Called on a blocking thread; implementations may do CPU-heavy work or
/// run external processes synchronously.
pub trait ThumbnailRenderer: Send + Sync + 'static {
    /// Write a PNG preview of `source` to `dest`, `width` pixels wide.
    fn render(
        &self,
        source: &Path,
        dest: &Path,
        width: u32,
        style: ThumbnailStyle,
    ) -> Result<(), ThumbnailError>;
}
