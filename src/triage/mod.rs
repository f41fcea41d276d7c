//! Shared triage state.
//!
//! - `stage`: per-document enrichment stage and run admission
//! - `history`: recently applied tag sets
//! - `undo`: single-level undo of the last tagging action
//! - `provenance`: which dates came from inference
//! - `inbox`: the service that ties them together

mod history;
mod inbox;
mod provenance;
mod stage;
mod undo;

pub use history::{ApplyReport, RecentTagSet, TagHistory, TagSetEntry, HISTORY_CAPACITY};
pub use inbox::{
    AboutView, CreatedTag, Inbox, InboxError, InboxItem, InboxView, TagGroupView, TagItem,
    DEFAULT_TAG_COLOR,
};
pub use provenance::ProvenanceFlags;
pub use stage::{Stage, StageClaim, StageTracker};
pub use undo::{UndoAction, UndoError, UndoRecord};
