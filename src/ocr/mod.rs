//! OCR text extraction.
//!
//! Extracts text from documents using:
//! - pdftoppm (Poppler) to rasterise the first page of a PDF
//! - Tesseract OCR for the resulting page image or for image files
//!
//! The enrichment pipeline only sees the [`TextExtractor`] trait.

mod backend;
mod tesseract;

pub use backend::{normalize_doc_type, DocumentKind, OcrError, TextExtractor};
pub use tesseract::{TesseractExtractor, DEFAULT_OCR_TIMEOUT};
