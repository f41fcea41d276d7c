//! Background enrichment.
//!
//! - `enrichment`: download, OCR, text upload, date inference, date upload
//! - `queue`: bounded job queue and worker tasks that run enrichment and
//!   preview generation off the request path

mod enrichment;
mod queue;

pub use enrichment::{EnrichmentError, EnrichmentOutcome, EnrichmentPipeline};
pub use queue::{BackgroundQueue, SubmitOutcome};
