//! Single-level undo of the last tagging action.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::info;

use crate::store::{DocumentStore, StoreError, TagId};

/// A reversible action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    /// A tag was added to a document in the store.
    TagAdded {
        doc_id: String,
        doc_name: String,
        tag_id: TagId,
        tag_name: String,
    },
    /// A file was moved from an inbox directory into a tag directory.
    FileMoved {
        file: String,
        from_dir: PathBuf,
        to_dir: PathBuf,
    },
}

impl UndoAction {
    /// Short name of the thing the action touched, for UI messages.
    pub fn subject(&self) -> &str {
        match self {
            UndoAction::TagAdded {
                doc_name, doc_id, ..
            } => {
                if doc_name.is_empty() {
                    doc_id
                } else {
                    doc_name
                }
            }
            UndoAction::FileMoved { file, .. } => file,
        }
    }
}

#[derive(Debug, Error)]
pub enum UndoError {
    #[error("Failed to remove tag {tag_id} from {doc_id}: {source}")]
    RemoveTag {
        doc_id: String,
        tag_id: TagId,
        #[source]
        source: StoreError,
    },

    #[error("Failed to move {file} back: {source}")]
    MoveBack {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

/// Holds at most one pending [`UndoAction`].
#[derive(Debug, Default)]
pub struct UndoRecord {
    slot: Mutex<Option<UndoAction>>,
}

impl UndoRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever was recorded before.
    pub fn record(&self, action: UndoAction) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(action);
    }

    pub fn is_available(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn pending(&self) -> Option<UndoAction> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// What the next undo would revert, if anything.
    pub fn description(&self) -> Option<String> {
        self.pending().map(|a| a.subject().to_string())
    }

    /// Reverse the recorded action.
    ///
    /// The record is taken before the reversal runs, so it is cleared even
    /// when the reversal fails and a second call always returns `Ok(None)`
    /// without touching the store.
    pub async fn undo(&self, store: &dyn DocumentStore) -> Result<Option<UndoAction>, UndoError> {
        let action = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(action) = action else {
            return Ok(None);
        };

        match &action {
            UndoAction::TagAdded { doc_id, tag_id, .. } => {
                store
                    .remove_tag(doc_id, *tag_id)
                    .await
                    .map_err(|source| UndoError::RemoveTag {
                        doc_id: doc_id.clone(),
                        tag_id: *tag_id,
                        source,
                    })?;
            }
            UndoAction::FileMoved {
                file,
                from_dir,
                to_dir,
            } => {
                tokio::fs::rename(to_dir.join(file), from_dir.join(file))
                    .await
                    .map_err(|source| UndoError::MoveBack {
                        file: file.clone(),
                        source,
                    })?;
            }
        }

        info!("Undid last action on {}", action.subject());
        Ok(Some(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStore;
    use tempfile::tempdir;

    fn tag_added(doc_id: &str, tag_id: TagId) -> UndoAction {
        UndoAction::TagAdded {
            doc_id: doc_id.to_string(),
            doc_name: format!("{}.pdf", doc_id),
            tag_id,
            tag_name: "letters".to_string(),
        }
    }

    #[tokio::test]
    async fn test_undo_removes_tag_once() {
        let store = FakeStore::new();
        let undo = UndoRecord::new();
        undo.record(tag_added("D3", 18));
        assert!(undo.is_available());
        assert_eq!(undo.description().as_deref(), Some("D3.pdf"));

        let undone = undo.undo(&store).await.unwrap();
        assert_eq!(undone, Some(tag_added("D3", 18)));
        assert_eq!(store.removed_tags(), vec![("D3".to_string(), 18)]);

        let calls_before = store.call_count();
        assert_eq!(undo.undo(&store).await.unwrap(), None);
        assert_eq!(store.call_count(), calls_before);
        assert!(!undo.is_available());
    }

    #[tokio::test]
    async fn test_undo_without_record_is_noop() {
        let store = FakeStore::new();
        let undo = UndoRecord::new();
        assert_eq!(undo.undo(&store).await.unwrap(), None);
        assert_eq!(store.call_count(), 0);
        assert!(undo.description().is_none());
    }

    #[tokio::test]
    async fn test_record_overwrites_previous() {
        let store = FakeStore::new();
        let undo = UndoRecord::new();
        undo.record(tag_added("D1", 1));
        undo.record(tag_added("D2", 2));

        undo.undo(&store).await.unwrap();
        assert_eq!(store.removed_tags(), vec![("D2".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_failed_undo_clears_record() {
        let store = FakeStore::new();
        store.fail_removals();
        let undo = UndoRecord::new();
        undo.record(tag_added("D1", 5));

        let err = undo.undo(&store).await.unwrap_err();
        assert!(matches!(err, UndoError::RemoveTag { tag_id: 5, .. }));
        assert!(!undo.is_available());
    }

    #[tokio::test]
    async fn test_undo_moves_file_back() {
        let dir = tempdir().unwrap();
        let inbox = dir.path().join("inbox");
        let tagged = dir.path().join("tagged").join("reference");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::create_dir_all(&tagged).unwrap();
        std::fs::write(tagged.join("notes.md"), "# notes").unwrap();

        let store = FakeStore::new();
        let undo = UndoRecord::new();
        undo.record(UndoAction::FileMoved {
            file: "notes.md".to_string(),
            from_dir: inbox.clone(),
            to_dir: tagged.clone(),
        });
        assert_eq!(undo.description().as_deref(), Some("notes.md"));

        assert!(undo.undo(&store).await.unwrap().is_some());
        assert!(inbox.join("notes.md").exists());
        assert!(!tagged.join("notes.md").exists());
        assert_eq!(store.call_count(), 0);
    }

    #[test]
    fn test_subject_falls_back_to_id() {
        let action = UndoAction::TagAdded {
            doc_id: "01HX".to_string(),
            doc_name: String::new(),
            tag_id: 1,
            tag_name: "x".to_string(),
        };
        assert_eq!(action.subject(), "01HX");
    }
}
