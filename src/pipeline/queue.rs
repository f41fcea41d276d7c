//! Bounded background job queues with per-document dedup.
//!
//! Page views submit work and return immediately. A job that cannot be
//! queued is dropped; the next page view submits it again.
//!
//! Enrichment and preview jobs have separate channels and workers. An OCR
//! run can hold a worker for minutes, while the preview of the document on
//! screen should appear in seconds.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use super::EnrichmentPipeline;
use crate::thumbnail::ThumbnailCache;
use crate::triage::{StageClaim, StageTracker};

/// Result of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Queued,
    /// The same kind of job is already queued or running for the document.
    AlreadyRunning,
    /// The queue was full; nothing was recorded.
    QueueFull,
    /// The workers are gone.
    Stopped,
}

/// Marks a document as having a preview generation queued or running.
struct ThumbnailSlot {
    in_flight: Arc<Mutex<HashSet<String>>>,
    doc_id: String,
}

impl Drop for ThumbnailSlot {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.doc_id);
    }
}

enum Job {
    Enrich { claim: StageClaim, doc_type: String },
    Thumbnail { slot: ThumbnailSlot, doc_type: String },
}

impl Job {
    fn describe(&self) -> String {
        match self {
            Job::Enrich { claim, .. } => format!("enrichment of {}", claim.doc_id()),
            Job::Thumbnail { slot, .. } => format!("preview of {}", slot.doc_id),
        }
    }
}

/// Workers dedicated to preview generation.
pub const PREVIEW_WORKERS: usize = 1;

pub struct BackgroundQueue {
    enrich_tx: mpsc::Sender<Job>,
    preview_tx: mpsc::Sender<Job>,
    tracker: Arc<StageTracker>,
    thumbnails_in_flight: Arc<Mutex<HashSet<String>>>,
}

impl BackgroundQueue {
    /// Create both queues, each holding up to `capacity` jobs, and spawn
    /// `workers` enrichment workers plus the preview workers on the current
    /// runtime.
    pub fn start(
        capacity: usize,
        workers: usize,
        tracker: Arc<StageTracker>,
        pipeline: Arc<EnrichmentPipeline>,
        thumbnails: Arc<ThumbnailCache>,
    ) -> Self {
        let enrich_tx = spawn_workers("enrichment", capacity, workers, &pipeline, &thumbnails);
        let preview_tx =
            spawn_workers("preview", capacity, PREVIEW_WORKERS, &pipeline, &thumbnails);

        Self {
            enrich_tx,
            preview_tx,
            tracker,
            thumbnails_in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Queue an enrichment run unless one is already in progress.
    pub fn submit_enrichment(&self, doc_id: &str, doc_type: &str) -> SubmitOutcome {
        let Some(claim) = self.tracker.claim(doc_id) else {
            return SubmitOutcome::AlreadyRunning;
        };
        send(
            &self.enrich_tx,
            Job::Enrich {
                claim,
                doc_type: doc_type.to_string(),
            },
        )
    }

    /// Queue a preview generation unless one is already in progress.
    pub fn submit_thumbnail(&self, doc_id: &str, doc_type: &str) -> SubmitOutcome {
        let inserted = self
            .thumbnails_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(doc_id.to_string());
        if !inserted {
            return SubmitOutcome::AlreadyRunning;
        }
        let slot = ThumbnailSlot {
            in_flight: Arc::clone(&self.thumbnails_in_flight),
            doc_id: doc_id.to_string(),
        };
        send(
            &self.preview_tx,
            Job::Thumbnail {
                slot,
                doc_type: doc_type.to_string(),
            },
        )
    }

    pub fn is_generating_thumbnail(&self, doc_id: &str) -> bool {
        self.thumbnails_in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(doc_id)
    }
}

/// A rejected job is dropped here, which releases its claim or slot.
fn send(tx: &mpsc::Sender<Job>, job: Job) -> SubmitOutcome {
    match tx.try_send(job) {
        Ok(()) => SubmitOutcome::Queued,
        Err(TrySendError::Full(job)) => {
            debug!("Queue full, dropping {}", job.describe());
            SubmitOutcome::QueueFull
        }
        Err(TrySendError::Closed(job)) => {
            warn!("Workers stopped, dropping {}", job.describe());
            SubmitOutcome::Stopped
        }
    }
}

fn spawn_workers(
    kind: &'static str,
    capacity: usize,
    workers: usize,
    pipeline: &Arc<EnrichmentPipeline>,
    thumbnails: &Arc<ThumbnailCache>,
) -> mpsc::Sender<Job> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    for worker_id in 0..workers.max(1) {
        tokio::spawn(run_worker(
            kind,
            worker_id,
            Arc::clone(&rx),
            Arc::clone(pipeline),
            Arc::clone(thumbnails),
        ));
    }
    tx
}

async fn run_worker(
    kind: &'static str,
    worker_id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    pipeline: Arc<EnrichmentPipeline>,
    thumbnails: Arc<ThumbnailCache>,
) {
    debug!("{} worker {} started", kind, worker_id);
    loop {
        let job = rx.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        let label = job.describe();

        // Run each job in its own task so a panic only loses that job; the
        // claim or slot moves with it and is released on unwind.
        let pipeline = Arc::clone(&pipeline);
        let thumbnails = Arc::clone(&thumbnails);
        let handle = tokio::spawn(async move {
            match job {
                Job::Enrich { claim, doc_type } => pipeline.run_logged(claim, &doc_type).await,
                Job::Thumbnail { slot, doc_type } => {
                    thumbnails.generate(&slot.doc_id, &doc_type).await;
                }
            }
        });
        if let Err(e) = handle.await {
            error!("{} worker {}: {} aborted: {}", kind, worker_id, label, e);
        }
    }
    debug!("{} worker {} stopped", kind, worker_id);
}
