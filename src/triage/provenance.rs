//! Which document dates were set by inference.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// Set of document ids whose date field was last written by date inference.
/// Entries are only ever added.
#[derive(Debug, Default)]
pub struct ProvenanceFlags {
    inferred: RwLock<HashSet<String>>,
}

impl ProvenanceFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_inferred(&self, doc_id: &str) {
        self.inferred
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(doc_id.to_string());
    }

    pub fn is_inferred(&self, doc_id: &str) -> bool {
        self.inferred
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(doc_id)
    }
}
