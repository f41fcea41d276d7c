//! Tesseract OCR extractor.
//!
//! Uses Tesseract via command-line. PDFs are rasterised with `pdftoppm`
//! (first page only) before OCR.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use super::backend::{DocumentKind, OcrError, TextExtractor};

/// Default per-process timeout for external OCR tools.
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(120);

/// Tesseract-backed [`TextExtractor`].
pub struct TesseractExtractor {
    language: String,
    timeout: Duration,
}

impl TesseractExtractor {
    pub fn new() -> Self {
        Self {
            language: "eng".to_string(),
            timeout: DEFAULT_OCR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Check that `tesseract` and `pdftoppm` are on PATH.
    pub fn availability_hint() -> Option<String> {
        if which::which("tesseract").is_err() {
            Some("Tesseract not installed. Install with: apt install tesseract-ocr".to_string())
        } else if which::which("pdftoppm").is_err() {
            Some("pdftoppm not installed. Install with: apt install poppler-utils".to_string())
        } else {
            None
        }
    }

    /// Run a tool to completion, killing it if it outlives the timeout.
    async fn run_tool(&self, tool: &str, mut cmd: Command) -> Result<Output, OcrError> {
        cmd.kill_on_drop(true);
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result,
            Err(_) => {
                return Err(OcrError::Timeout {
                    tool: tool.to_string(),
                    after: self.timeout,
                })
            }
        };

        match output {
            Ok(output) if output.status.success() => Ok(output),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::OcrFailed(format!("{} failed: {}", tool, stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::ToolNotFound(tool.to_string()))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    async fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let mut cmd = Command::new("tesseract");
        cmd.arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language]);
        let output = self.run_tool("tesseract", cmd).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Rasterise the first page of a PDF into `output_dir`.
    async fn first_page_to_image(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, OcrError> {
        let prefix = output_dir.join("page");
        let mut cmd = Command::new("pdftoppm");
        cmd.args(["-png", "-f", "1", "-l", "1", "-singlefile"])
            .arg(pdf_path)
            .arg(&prefix);
        self.run_tool("pdftoppm", cmd).await?;

        let image = prefix.with_extension("png");
        if image.exists() {
            Ok(image)
        } else {
            Err(OcrError::OcrFailed(
                "pdftoppm produced no page image".to_string(),
            ))
        }
    }
}

impl Default for TesseractExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract(&self, path: &Path, doc_type: &str) -> Result<String, OcrError> {
        let kind = DocumentKind::from_doc_type(doc_type)
            .ok_or_else(|| OcrError::UnsupportedType(doc_type.to_string()))?;

        debug!("Running {:?} OCR on {}", kind, path.display());
        match kind {
            DocumentKind::Pdf => {
                let temp_dir = TempDir::new()?;
                let image = self.first_page_to_image(path, temp_dir.path()).await?;
                self.run_tesseract(&image).await
            }
            DocumentKind::Image => self.run_tesseract(path).await,
        }
    }
}
