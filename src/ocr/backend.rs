//! Extractor abstraction and error types.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Not retried more aggressively than any other trigger: the next page
    /// view will try again while the document still has no text.
    #[error("Unsupported document type for OCR: {0}")]
    UnsupportedType(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("{tool} timed out after {}s", .after.as_secs())]
    Timeout { tool: String, after: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Input formats the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Rasterise the first page, then OCR it.
    Pdf,
    /// OCR the file directly.
    Image,
}

impl DocumentKind {
    /// Classify an extension-like document type (`.pdf`, `PNG`, ...).
    pub fn from_doc_type(doc_type: &str) -> Option<Self> {
        match normalize_doc_type(doc_type).as_str() {
            ".pdf" => Some(DocumentKind::Pdf),
            ".png" | ".jpg" | ".jpeg" | ".tiff" | ".bmp" => Some(DocumentKind::Image),
            _ => None,
        }
    }
}

/// Lowercase a document type and make sure it carries a leading dot.
pub fn normalize_doc_type(doc_type: &str) -> String {
    let trimmed = doc_type.trim().to_lowercase();
    if trimmed.is_empty() || trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{}", trimmed)
    }
}

/// Turns a document on disk into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from `path`, interpreting it according to `doc_type`.
    ///
    /// Returns [`OcrError::UnsupportedType`] for document types the
    /// extractor cannot read.
    async fn extract(&self, path: &Path, doc_type: &str) -> Result<String, OcrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_doc_type() {
        assert_eq!(DocumentKind::from_doc_type(".pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_doc_type(".PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_doc_type("jpeg"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_doc_type(".tiff"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_doc_type(".docx"), None);
        assert_eq!(DocumentKind::from_doc_type(""), None);
    }

    #[test]
    fn test_normalize_doc_type() {
        assert_eq!(normalize_doc_type("PNG"), ".png");
        assert_eq!(normalize_doc_type(" .Pdf "), ".pdf");
        assert_eq!(normalize_doc_type(""), "");
    }

    #[test]
    fn test_timeout_message() {
        let err = OcrError::Timeout {
            tool: "tesseract".to_string(),
            after: Duration::from_secs(120),
        };
        assert_eq!(err.to_string(), "tesseract timed out after 120s");
    }
}
