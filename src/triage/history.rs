//! Recently applied tag sets, for one-keystroke reapplication.

use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, warn};

use crate::store::{DocumentStore, StoreError, StoreTag, TagId};

/// Number of tag sets kept.
pub const HISTORY_CAPACITY: usize = 3;

/// One tag inside a remembered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSetEntry {
    pub id: TagId,
    pub name: String,
    pub color: String,
}

/// A set of tags applied together, labelled by its sorted tag names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentTagSet {
    pub tags: Vec<TagSetEntry>,
    pub label: String,
}

impl RecentTagSet {
    /// Build a set from a document's tags. `None` for an empty tag list.
    pub fn from_tags(tags: &[StoreTag]) -> Option<Self> {
        if tags.is_empty() {
            return None;
        }
        let entries: Vec<TagSetEntry> = tags
            .iter()
            .map(|t| TagSetEntry {
                id: t.id,
                name: t.name.clone(),
                color: t.color.clone(),
            })
            .collect();
        let mut names: Vec<&str> = entries.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        let label = names.join(", ");
        Some(Self {
            tags: entries,
            label,
        })
    }
}

/// Result of reapplying a remembered set.
#[derive(Debug)]
pub struct ApplyReport {
    pub set: RecentTagSet,
    /// Tags the store refused; the remaining tags were still added.
    pub failed: Vec<(TagId, StoreError)>,
}

/// Bounded, label-deduplicated, most-recent-first list of tag sets.
pub struct TagHistory {
    entries: RwLock<Vec<RecentTagSet>>,
    /// Serializes whole captures (fetch + update) so dedup never interleaves.
    capture_lock: tokio::sync::Mutex<()>,
}

impl TagHistory {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::with_capacity(HISTORY_CAPACITY)),
            capture_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Current entries, most recent first.
    pub fn snapshot(&self) -> Vec<RecentTagSet> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<RecentTagSet> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    /// Put `set` at the front, dropping any entry with the same label and
    /// anything beyond capacity.
    pub fn push(&self, set: RecentTagSet) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.retain(|existing| existing.label != set.label);
        entries.insert(0, set);
        entries.truncate(HISTORY_CAPACITY);
    }

    /// Remember the document's current tag set.
    ///
    /// A document with no tags, or whose tags cannot be read, leaves the
    /// history untouched. Returns whether a set was recorded.
    pub async fn capture(&self, store: &dyn DocumentStore, doc_id: &str) -> bool {
        let _serial = self.capture_lock.lock().await;

        let tags = match store.fetch_document_tags(doc_id).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!("Could not read tags of {} for history: {}", doc_id, e);
                return false;
            }
        };

        match RecentTagSet::from_tags(&tags) {
            Some(set) => {
                debug!("Captured tag set '{}' from {}", set.label, doc_id);
                self.push(set);
                true
            }
            None => false,
        }
    }

    /// Add every tag of the set at `index` to `doc_id`, then re-capture the
    /// document so the updated set moves to the front.
    ///
    /// Out-of-range `index` returns `None` without touching the store.
    pub async fn apply(
        &self,
        store: &dyn DocumentStore,
        index: usize,
        doc_id: &str,
    ) -> Option<ApplyReport> {
        let set = self.get(index)?;

        let mut failed = Vec::new();
        for tag in &set.tags {
            if let Err(e) = store.add_tag(doc_id, tag.id).await {
                warn!("Failed to add tag {} to {}: {}", tag.id, doc_id, e);
                failed.push((tag.id, e));
            }
        }

        self.capture(store, doc_id).await;
        Some(ApplyReport { set, failed })
    }
}

impl Default for TagHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStore;

    fn tag(id: TagId, name: &str) -> StoreTag {
        StoreTag {
            id,
            name: name.to_string(),
            color: "#888".to_string(),
            tag_group: String::new(),
            sort_order: 0,
        }
    }

    #[test]
    fn test_label_is_sorted_names() {
        let set = RecentTagSet::from_tags(&[tag(2, "t2"), tag(1, "t1"), tag(3, "a")]).unwrap();
        assert_eq!(set.label, "a, t1, t2");
        // Tag order is kept as the store returned it
        assert_eq!(set.tags[0].id, 2);
        assert!(RecentTagSet::from_tags(&[]).is_none());
    }

    #[test]
    fn test_push_bounds_and_dedups() {
        let history = TagHistory::new();
        for name in ["a", "b", "c", "d"] {
            history.push(RecentTagSet::from_tags(&[tag(1, name)]).unwrap());
        }
        let labels: Vec<_> = history.snapshot().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["d", "c", "b"]);

        history.push(RecentTagSet::from_tags(&[tag(9, "b")]).unwrap());
        let labels: Vec<_> = history.snapshot().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["b", "d", "c"]);
        assert_eq!(history.get(0).unwrap().tags[0].id, 9);
    }

    #[tokio::test]
    async fn test_capture_same_label_replaces_entry() {
        let store = FakeStore::new();
        store.set_tags("D2", vec![tag(1, "t1"), tag(2, "t2")]);
        store.set_tags("D3", vec![tag(11, "t2"), tag(12, "t1")]);
        let history = TagHistory::new();

        assert!(history.capture(&store, "D2").await);
        let entries = history.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "t1, t2");

        assert!(history.capture(&store, "D3").await);
        let entries = history.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "t1, t2");
        assert_eq!(entries[0].tags[0].id, 11);
    }

    #[tokio::test]
    async fn test_capture_empty_set_leaves_history() {
        let store = FakeStore::new();
        store.set_tags("D1", vec![tag(1, "x")]);
        let history = TagHistory::new();
        history.capture(&store, "D1").await;

        assert!(!history.capture(&store, "EMPTY").await);
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(0).unwrap().label, "x");
    }

    #[tokio::test]
    async fn test_capture_read_failure_is_noop() {
        let store = FakeStore::new();
        store.fail_tag_reads();
        let history = TagHistory::new();
        assert!(!history.capture(&store, "D1").await);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_never_exceeds_capacity() {
        let store = FakeStore::new();
        let history = TagHistory::new();
        for i in 0..10 {
            let doc = format!("D{}", i);
            store.set_tags(&doc, vec![tag(i, &format!("tag{}", i % 5))]);
            history.capture(&store, &doc).await;
            let entries = history.snapshot();
            assert!(entries.len() <= HISTORY_CAPACITY);
            for (i, a) in entries.iter().enumerate() {
                for b in &entries[i + 1..] {
                    assert_ne!(a.label, b.label);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_apply_adds_tags_and_recaptures() {
        let store = FakeStore::new();
        store.set_tags("D1", vec![tag(1, "bank"), tag(2, "tax")]);
        store.set_tags("D2", vec![tag(3, "letters")]);
        let history = TagHistory::new();
        history.capture(&store, "D1").await;
        history.capture(&store, "D2").await;
        assert_eq!(history.get(1).unwrap().label, "bank, tax");

        let report = history.apply(&store, 1, "NEW").await.unwrap();
        assert!(report.failed.is_empty());
        assert_eq!(report.set.label, "bank, tax");
        assert_eq!(store.added_tags(), vec![("NEW".to_string(), 1), ("NEW".to_string(), 2)]);

        // The reapplied set is now the most recent
        assert_eq!(history.get(0).unwrap().label, "bank, tax");
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_out_of_range_is_noop() {
        let store = FakeStore::new();
        let history = TagHistory::new();
        assert!(history.apply(&store, 0, "D1").await.is_none());
        assert!(history.apply(&store, 7, "D1").await.is_none());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_reports_failed_tags() {
        let store = FakeStore::new();
        store.set_tags("D1", vec![tag(1, "a"), tag(2, "b")]);
        let history = TagHistory::new();
        history.capture(&store, "D1").await;

        store.reject_tag(2);
        let report = history.apply(&store, 0, "D9").await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 2);
        assert_eq!(store.added_tags(), vec![("D9".to_string(), 1)]);
    }
}
