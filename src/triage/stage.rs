//! Per-document processing-stage registry.
//!
//! A document has an entry only while an enrichment run holds its claim.
//! The map is guarded by its own mutex, never held across an await, so a
//! slow pipeline step cannot block page rendering or tagging.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::warn;

/// Enrichment phase of a document. `Idle` means no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    OcrRunning,
    DateInferenceRunning,
}

impl Stage {
    /// Wire label, identical to the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::OcrRunning => "ocr_running",
            Stage::DateInferenceRunning => "date_inference_running",
        }
    }

    pub fn is_running(&self) -> bool {
        !matches!(self, Stage::Idle)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Admission control for enrichment runs: at most one per document.
#[derive(Debug, Default)]
pub struct StageTracker {
    stages: Mutex<HashMap<String, Stage>>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Stage>> {
        // A poisoned map is still structurally valid; keep serving it.
        self.stages.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `OcrRunning` for `doc_id` if it has no entry. Returns whether
    /// the claim succeeded; a failed claim changes nothing.
    pub fn try_claim(&self, doc_id: &str) -> bool {
        let mut stages = self.lock();
        if stages.contains_key(doc_id) {
            return false;
        }
        stages.insert(doc_id.to_string(), Stage::OcrRunning);
        true
    }

    /// Claim `doc_id` and return a guard that releases it on drop.
    pub fn claim(self: &Arc<Self>, doc_id: &str) -> Option<StageClaim> {
        if self.try_claim(doc_id) {
            Some(StageClaim {
                tracker: Arc::clone(self),
                doc_id: doc_id.to_string(),
            })
        } else {
            None
        }
    }

    /// Overwrite the stage of an already-claimed document.
    pub fn advance(&self, doc_id: &str, stage: Stage) {
        let mut stages = self.lock();
        match stages.get_mut(doc_id) {
            Some(current) if stage != Stage::Idle => *current = stage,
            Some(_) => {
                stages.remove(doc_id);
            }
            None => warn!("Ignoring stage change to {} for unclaimed {}", stage, doc_id),
        }
    }

    /// Remove the entry for `doc_id`. Idempotent.
    pub fn release(&self, doc_id: &str) {
        self.lock().remove(doc_id);
    }

    pub fn current_stage(&self, doc_id: &str) -> Stage {
        self.lock().get(doc_id).copied().unwrap_or(Stage::Idle)
    }

    /// Copy of every in-progress entry.
    pub fn snapshot(&self) -> HashMap<String, Stage> {
        self.lock().clone()
    }

    pub fn in_progress(&self) -> usize {
        self.lock().len()
    }
}

/// Exclusive right to run enrichment for one document.
///
/// Dropping the claim releases the document, so every exit path of a run
/// (including a panic in the worker) leaves the tracker clean.
#[derive(Debug)]
pub struct StageClaim {
    tracker: Arc<StageTracker>,
    doc_id: String,
}

impl StageClaim {
    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn advance(&self, stage: Stage) {
        self.tracker.advance(&self.doc_id, stage);
    }

    pub fn stage(&self) -> Stage {
        self.tracker.current_stage(&self.doc_id)
    }
}

impl Drop for StageClaim {
    fn drop(&mut self) {
        self.tracker.release(&self.doc_id);
    }
}
