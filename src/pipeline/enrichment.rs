//! Text extraction followed by date inference for one document.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm::{parse_inferred_date, truncate_chars, DateInference, LlmConfig, MAX_INFERENCE_CHARS};
use crate::ocr::{OcrError, TextExtractor};
use crate::store::{DocumentStore, StoreError};
use crate::triage::{ProvenanceFlags, Stage, StageClaim};
use crate::utils::scratch_extension;

/// How far a run got once its text was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// Text uploaded and the inferred date stored.
    Dated(NaiveDate),
    /// Text uploaded; the model found no usable date.
    NoDate,
    /// Text uploaded; the inference service could not be used.
    InferenceUnavailable,
    /// Text uploaded and a date inferred, but the store refused it.
    DateNotStored(NaiveDate),
}

/// Failures that end a run before any text reaches the store.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Download failed: {0}")]
    Download(#[source] StoreError),

    #[error("Scratch file failed: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("Unsupported document type: {0}")]
    UnsupportedType(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[source] OcrError),

    #[error("No text extracted")]
    EmptyText,

    #[error("Text upload failed: {0}")]
    UploadText(#[source] StoreError),
}

impl EnrichmentError {
    /// Whether this ends a run in the ordinary course of things rather than
    /// pointing at a broken collaborator.
    pub fn is_expected(&self) -> bool {
        matches!(self, EnrichmentError::UnsupportedType(_) | EnrichmentError::EmptyText)
    }
}

/// Runs OCR and date inference for documents that have no text yet.
pub struct EnrichmentPipeline {
    store: Arc<dyn DocumentStore>,
    extractor: Arc<dyn TextExtractor>,
    inference: Arc<dyn DateInference>,
    provenance: Arc<ProvenanceFlags>,
    llm: LlmConfig,
    scratch_dir: PathBuf,
}

impl EnrichmentPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        extractor: Arc<dyn TextExtractor>,
        inference: Arc<dyn DateInference>,
        provenance: Arc<ProvenanceFlags>,
        llm: LlmConfig,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            extractor,
            inference,
            provenance,
            llm,
            scratch_dir,
        }
    }

    /// Run the pipeline, logging the result instead of returning it.
    pub async fn run_logged(&self, claim: StageClaim, doc_type: &str) {
        let doc_id = claim.doc_id().to_string();
        match self.run(claim, doc_type).await {
            Ok(EnrichmentOutcome::Dated(date)) => {
                info!("Enriched {}: text stored, date {}", doc_id, date)
            }
            Ok(outcome) => info!("Enriched {}: text stored ({:?})", doc_id, outcome),
            Err(e) if e.is_expected() => debug!("Skipping enrichment of {}: {}", doc_id, e),
            Err(e) => warn!("Enrichment of {} failed: {}", doc_id, e),
        }
    }

    /// Run the pipeline for the claimed document.
    ///
    /// The claim is consumed; the stage is back to idle when this returns,
    /// whatever the result.
    pub async fn run(
        &self,
        claim: StageClaim,
        doc_type: &str,
    ) -> Result<EnrichmentOutcome, EnrichmentError> {
        let doc_id = claim.doc_id().to_string();
        info!("Starting enrichment for {} (type={})", doc_id, doc_type);

        let text = self.extract_text(&doc_id, doc_type).await?;
        if text.trim().is_empty() {
            return Err(EnrichmentError::EmptyText);
        }
        debug!("Extracted {} chars for {}", text.chars().count(), doc_id);

        self.store
            .upload_text(&doc_id, &text)
            .await
            .map_err(EnrichmentError::UploadText)?;

        claim.advance(Stage::DateInferenceRunning);
        Ok(self.infer_date(&doc_id, &text).await)
    }

    /// Download the document into a scratch file and extract its text.
    /// The scratch file is removed when this returns.
    async fn extract_text(&self, doc_id: &str, doc_type: &str) -> Result<String, EnrichmentError> {
        let content = self
            .store
            .download(doc_id)
            .await
            .map_err(EnrichmentError::Download)?;

        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let mut scratch = tempfile::Builder::new()
            .prefix("docinbox-ocr-")
            .suffix(&scratch_extension(doc_type, &content.content_type))
            .tempfile_in(&self.scratch_dir)?;
        scratch.write_all(&content.bytes)?;
        scratch.flush()?;

        match self.extractor.extract(scratch.path(), doc_type).await {
            Ok(text) => Ok(text),
            Err(OcrError::UnsupportedType(t)) => Err(EnrichmentError::UnsupportedType(t)),
            Err(e) => Err(EnrichmentError::Extraction(e)),
        }
    }

    async fn infer_date(&self, doc_id: &str, text: &str) -> EnrichmentOutcome {
        let endpoint = self.llm.resolved_endpoint();
        let model = self.llm.resolved_model();
        let excerpt = truncate_chars(text, MAX_INFERENCE_CHARS);

        let raw = match self.inference.infer_date(endpoint, model, excerpt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Date inference failed for {}: {}", doc_id, e);
                return EnrichmentOutcome::InferenceUnavailable;
            }
        };

        let Some(date) = parse_inferred_date(&raw) else {
            debug!("No date inferred for {} (answer {:?})", doc_id, raw.trim());
            return EnrichmentOutcome::NoDate;
        };

        match self.store.update_date(doc_id, date).await {
            Ok(()) => {
                self.provenance.mark_inferred(doc_id);
                EnrichmentOutcome::Dated(date)
            }
            Err(e) => {
                warn!("Storing inferred date {} for {} failed: {}", date, doc_id, e);
                EnrichmentOutcome::DateNotStored(date)
            }
        }
    }
}
