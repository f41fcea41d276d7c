//! The triage service: one untagged document at a time.
//!
//! [`Inbox`] owns every piece of shared triage state and is handed to the
//! HTTP layer behind an `Arc`. Page views read state and submit background
//! work; tagging actions update history and the undo record.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    ProvenanceFlags, RecentTagSet, Stage, StageTracker, TagHistory, UndoAction, UndoError,
    UndoRecord,
};
use crate::config::{Settings, ShortcutConfig};
use crate::llm::{truncate_chars, DateInference, MAX_INFERENCE_CHARS};
use crate::ocr::TextExtractor;
use crate::pipeline::{BackgroundQueue, EnrichmentPipeline, SubmitOutcome};
use crate::store::{
    DocumentContent, DocumentStatus, DocumentStore, StoreError, StoreTag, TagId,
};
use crate::thumbnail::{ThumbnailCache, ThumbnailRenderer};

/// Characters of text shown in the preview pane.
pub const TEXT_PREVIEW_CHARS: usize = MAX_INFERENCE_CHARS;

/// Color used for new tags when none is given.
pub const DEFAULT_TAG_COLOR: &str = "#3498db";

/// Group label for tags without a group.
const UNGROUPED: &str = "Other";

#[derive(Debug, Error)]
pub enum InboxError {
    #[error("Error connecting to godocs server: {0}")]
    Upstream(#[source] StoreError),

    #[error("Store rejected the change: {0}")]
    Store(#[from] StoreError),

    #[error("Unknown shortcut key '{0}'")]
    UnknownShortcut(String),

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{failed} of {total} tags not applied to {subject}")]
    PartialApply {
        failed: usize,
        total: usize,
        subject: String,
    },

    #[error(transparent)]
    Undo(#[from] UndoError),
}

impl InboxError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            InboxError::Upstream(_) => 502,
            InboxError::UnknownShortcut(_) | InboxError::Missing(_) => 400,
            InboxError::Store(_) | InboxError::PartialApply { .. } | InboxError::Undo(_) => 500,
        }
    }
}

/// The document currently presented for triage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InboxItem {
    pub ulid: String,
    pub name: String,
    pub doc_type: String,
    pub folder: String,
    pub ingress_time: String,
    /// Same-origin path of the store's own thumbnail.
    pub thumbnail_url: String,
    pub view_url: String,
    pub text_preview: String,
    pub has_thumbnail: bool,
    pub has_hires_thumb: bool,
    /// OCR running (or just submitted).
    pub processing: bool,
    /// Date inference running.
    pub llm_working: bool,
    pub document_date: String,
    pub date_is_inferred: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagItem {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub group: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagGroupView {
    pub name: String,
    pub tags: Vec<TagItem>,
}

/// Everything the triage page shows.
#[derive(Debug, Clone, Serialize)]
pub struct InboxView {
    pub item: Option<InboxItem>,
    pub remaining: u64,
    pub done: bool,
    pub shortcuts: Vec<ShortcutConfig>,
    pub groups: Vec<TagGroupView>,
    pub tag_groups: Vec<String>,
    pub recent_sets: Vec<RecentTagSet>,
    pub undoable: bool,
    pub undo_info: Option<String>,
    pub godocs_url: String,
}

/// Where the running configuration came from and what the server offers.
#[derive(Debug, Clone, Serialize)]
pub struct AboutView {
    pub config_source: Option<String>,
    pub godocs_url: String,
    pub shortcuts: Vec<ShortcutConfig>,
    /// Every known tag, sorted by name.
    pub server_tags: Vec<StoreTag>,
}

/// Result of creating a tag.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedTag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub group: String,
    pub applied: bool,
}

pub struct Inbox {
    store: Arc<dyn DocumentStore>,
    tracker: Arc<StageTracker>,
    thumbnails: Arc<ThumbnailCache>,
    queue: BackgroundQueue,
    history: TagHistory,
    undo: UndoRecord,
    provenance: Arc<ProvenanceFlags>,
    shortcuts: Vec<ShortcutConfig>,
    catalog: RwLock<HashMap<TagId, StoreTag>>,
    godocs_url: String,
    config_source: Option<PathBuf>,
}

impl Inbox {
    /// Wire up the triage state and start the background workers. Must be
    /// called inside a tokio runtime.
    pub fn start(
        settings: &Settings,
        store: Arc<dyn DocumentStore>,
        extractor: Arc<dyn TextExtractor>,
        inference: Arc<dyn DateInference>,
        renderer: Arc<dyn ThumbnailRenderer>,
    ) -> Self {
        let tracker = Arc::new(StageTracker::new());
        let provenance = Arc::new(ProvenanceFlags::new());
        let pipeline = Arc::new(EnrichmentPipeline::new(
            Arc::clone(&store),
            extractor,
            inference,
            Arc::clone(&provenance),
            settings.llm.clone(),
            settings.scratch_dir.clone(),
        ));
        let thumbnails = Arc::new(ThumbnailCache::new(
            settings.thumb_dir.clone(),
            settings.scratch_dir.clone(),
            Arc::clone(&store),
            renderer,
        ));
        let queue = BackgroundQueue::start(
            settings.queue_capacity,
            settings.workers,
            Arc::clone(&tracker),
            pipeline,
            Arc::clone(&thumbnails),
        );

        Self {
            store,
            tracker,
            thumbnails,
            queue,
            history: TagHistory::new(),
            undo: UndoRecord::new(),
            provenance,
            shortcuts: settings.shortcuts.clone(),
            catalog: RwLock::new(HashMap::new()),
            godocs_url: settings.godocs_server.clone(),
            config_source: settings.config_source.clone(),
        }
    }

    /// Replace the local tag catalog with the server's. Returns the tags.
    pub async fn refresh_tags(&self) -> Result<Vec<StoreTag>, StoreError> {
        let tags = self.store.list_tags().await?;
        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        catalog.clear();
        catalog.extend(tags.iter().map(|t| (t.id, t.clone())));
        Ok(tags)
    }

    pub fn shortcuts(&self) -> &[ShortcutConfig] {
        &self.shortcuts
    }

    /// Configuration summary and the cached server tags.
    pub fn about(&self) -> AboutView {
        let mut server_tags: Vec<StoreTag> = self
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        server_tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        AboutView {
            config_source: self
                .config_source
                .as_ref()
                .map(|p| p.display().to_string()),
            godocs_url: self.godocs_url.clone(),
            shortcuts: self.shortcuts.clone(),
            server_tags,
        }
    }

    /// Build the triage page for the oldest untagged document.
    pub async fn view(&self) -> Result<InboxView, InboxError> {
        let page = self
            .store
            .fetch_untagged(1, 1)
            .await
            .map_err(InboxError::Upstream)?;

        let mut view = InboxView {
            item: None,
            remaining: page.total_count,
            done: false,
            shortcuts: self.shortcuts.clone(),
            groups: Vec::new(),
            tag_groups: Vec::new(),
            recent_sets: Vec::new(),
            undoable: self.undo.is_available(),
            undo_info: self.undo.description(),
            godocs_url: self.godocs_url.clone(),
        };

        let Some(doc) = page.documents.into_iter().next() else {
            view.done = true;
            return Ok(view);
        };

        let mut item = InboxItem {
            ulid: doc.ulid.clone(),
            name: doc.name,
            doc_type: doc.document_type,
            folder: doc.folder,
            ..Default::default()
        };

        match self.store.fetch_status(&doc.ulid).await {
            Ok(status) => self.apply_status(&mut item, &status),
            Err(e) => warn!("Could not fetch status of {}: {}", doc.ulid, e),
        }

        match self.store.fetch_text(&doc.ulid).await {
            Ok(text) if !text.is_empty() => item.text_preview = text_preview(&text),
            Ok(_) => {}
            Err(e) => debug!("No text preview for {}: {}", doc.ulid, e),
        }

        view.groups = self.build_tag_groups(&doc.ulid).await;
        view.tag_groups = self.store.list_tag_groups().await.unwrap_or_else(|e| {
            debug!("Could not list tag groups: {}", e);
            Vec::new()
        });
        view.recent_sets = self.history.snapshot();
        view.item = Some(item);
        Ok(view)
    }

    /// Annotate `item` from the store status and submit background work the
    /// document still needs.
    fn apply_status(&self, item: &mut InboxItem, status: &DocumentStatus) {
        let doc_id = item.ulid.clone();
        item.has_thumbnail = status.has_thumbnail;
        if status.has_thumbnail {
            item.thumbnail_url = format!("/proxy/thumbnail/{}", urlencoding::encode(&doc_id));
        }
        item.view_url = format!("{}{}", self.godocs_url, status.view_url);
        item.ingress_time = status.ingress_time.clone();
        item.document_date = status.document_date.clone();
        item.date_is_inferred = self.provenance.is_inferred(&doc_id);

        match self.tracker.current_stage(&doc_id) {
            Stage::OcrRunning => item.processing = true,
            Stage::DateInferenceRunning => item.llm_working = true,
            Stage::Idle if !status.has_text => {
                match self.queue.submit_enrichment(&doc_id, &status.document_type) {
                    SubmitOutcome::Queued | SubmitOutcome::AlreadyRunning => item.processing = true,
                    outcome => debug!("Enrichment of {} not queued: {:?}", doc_id, outcome),
                }
            }
            Stage::Idle => {}
        }

        if status.has_thumbnail {
            if self.thumbnails.exists(&doc_id) {
                item.has_hires_thumb = true;
            } else {
                let outcome = self.queue.submit_thumbnail(&doc_id, &status.document_type);
                debug!("Hi-res preview for {}: {:?}", doc_id, outcome);
            }
        }
    }

    /// All known tags grouped for the tag editor, with the document's
    /// current tags marked active.
    async fn build_tag_groups(&self, doc_id: &str) -> Vec<TagGroupView> {
        let active: Vec<TagId> = match self.store.fetch_document_tags(doc_id).await {
            Ok(tags) => tags.into_iter().map(|t| t.id).collect(),
            Err(e) => {
                debug!("Could not read tags of {}: {}", doc_id, e);
                Vec::new()
            }
        };

        let mut tags: Vec<StoreTag> = self
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        tags.sort_by(|a, b| {
            a.tag_group
                .cmp(&b.tag_group)
                .then(a.sort_order.cmp(&b.sort_order))
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut groups: Vec<TagGroupView> = Vec::new();
        for tag in tags {
            let group = if tag.tag_group.is_empty() {
                UNGROUPED.to_string()
            } else {
                tag.tag_group
            };
            let item = TagItem {
                id: tag.id,
                name: tag.name,
                color: tag.color,
                group: group.clone(),
                active: active.contains(&tag.id),
            };
            match groups.iter_mut().find(|g| g.name == group) {
                Some(existing) => existing.tags.push(item),
                None => groups.push(TagGroupView {
                    name: group,
                    tags: vec![item],
                }),
            }
        }
        groups
    }

    /// Apply the tag bound to `key`. Returns the flash message.
    pub async fn tag(&self, doc_id: &str, doc_name: &str, key: &str) -> Result<String, InboxError> {
        if doc_id.is_empty() {
            return Err(InboxError::Missing("ulid"));
        }
        let shortcut = self
            .shortcuts
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| InboxError::UnknownShortcut(key.to_string()))?;

        self.store.add_tag(doc_id, shortcut.tag_id).await?;
        self.history.capture(self.store.as_ref(), doc_id).await;
        self.undo.record(UndoAction::TagAdded {
            doc_id: doc_id.to_string(),
            doc_name: doc_name.to_string(),
            tag_id: shortcut.tag_id,
            tag_name: shortcut.name.clone(),
        });

        info!("Tagged {} with {}", doc_id, shortcut.name);
        Ok(format!("{}:{} \u{2190} {}", shortcut.key, shortcut.name, doc_name))
    }

    /// Finish with a document: remember its tag set.
    pub async fn done(&self, doc_id: &str) {
        if !doc_id.is_empty() {
            self.history.capture(self.store.as_ref(), doc_id).await;
        }
    }

    /// Reapply the recent tag set at `index`. `None` when there is no such
    /// set. Does not touch the undo record.
    ///
    /// Tags the store accepted stay applied when others are refused; the
    /// refusal is returned as [`InboxError::PartialApply`].
    pub async fn apply_tag_set(
        &self,
        index: usize,
        doc_id: &str,
        doc_name: &str,
    ) -> Result<Option<String>, InboxError> {
        if doc_id.is_empty() {
            return Err(InboxError::Missing("ulid"));
        }
        let Some(report) = self.history.apply(self.store.as_ref(), index, doc_id).await else {
            return Ok(None);
        };
        if !report.failed.is_empty() {
            for (tag_id, e) in &report.failed {
                warn!("Tag {} not applied to {}: {}", tag_id, doc_id, e);
            }
            return Err(InboxError::PartialApply {
                failed: report.failed.len(),
                total: report.set.tags.len(),
                subject: if doc_name.is_empty() {
                    doc_id.to_string()
                } else {
                    doc_name.to_string()
                },
            });
        }
        Ok(Some(format!("{} \u{2190} {}", report.set.label, doc_name)))
    }

    /// Revert the last tagging action. `None` when there is nothing to undo.
    pub async fn undo(&self) -> Result<Option<String>, InboxError> {
        Ok(self
            .undo
            .undo(self.store.as_ref())
            .await?
            .map(|action| format!("undo \u{2190} {}", action.subject())))
    }

    /// Add the tag if it is not `active`, remove it otherwise. Returns the
    /// new state.
    pub async fn toggle_tag(
        &self,
        doc_id: &str,
        tag_id: TagId,
        active: bool,
    ) -> Result<bool, InboxError> {
        if doc_id.is_empty() {
            return Err(InboxError::Missing("ulid"));
        }
        if active {
            self.store.remove_tag(doc_id, tag_id).await?;
        } else {
            self.store.add_tag(doc_id, tag_id).await?;
        }
        Ok(!active)
    }

    /// Create a tag and, when `doc_id` is given, apply it to that document.
    pub async fn create_tag(
        &self,
        name: &str,
        color: Option<&str>,
        group: Option<&str>,
        doc_id: Option<&str>,
    ) -> Result<CreatedTag, InboxError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InboxError::Missing("name"));
        }
        let color = color
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_TAG_COLOR);
        let group = group.map(str::trim).filter(|g| !g.is_empty());

        let tag = self.store.create_tag(name, color, group).await?;
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tag.id, tag.clone());
        info!("Created tag {} ({})", tag.name, tag.id);

        let mut applied = false;
        if let Some(doc_id) = doc_id.filter(|d| !d.is_empty()) {
            match self.store.add_tag(doc_id, tag.id).await {
                Ok(()) => applied = true,
                Err(e) => warn!("Applying new tag {} to {} failed: {}", tag.id, doc_id, e),
            }
        }

        Ok(CreatedTag {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            group: tag.tag_group,
            applied,
        })
    }

    /// The store's thumbnail for `doc_id`, fetched on behalf of the browser.
    pub async fn store_thumbnail(&self, doc_id: &str) -> Result<DocumentContent, InboxError> {
        self.store
            .fetch_thumbnail(doc_id)
            .await
            .map_err(InboxError::Upstream)
    }

    pub fn thumbnail_ready(&self, doc_id: &str) -> bool {
        self.thumbnails.ready(doc_id)
    }

    /// Path of the cached preview, if it exists.
    pub fn thumbnail_path(&self, doc_id: &str) -> Option<PathBuf> {
        let path = self.thumbnails.path(doc_id);
        path.is_file().then_some(path)
    }

    pub fn stage(&self, doc_id: &str) -> Stage {
        self.tracker.current_stage(doc_id)
    }

    pub fn date_is_inferred(&self, doc_id: &str) -> bool {
        self.provenance.is_inferred(doc_id)
    }

    pub fn recent_sets(&self) -> Vec<RecentTagSet> {
        self.history.snapshot()
    }
}

fn text_preview(text: &str) -> String {
    let head = truncate_chars(text, TEXT_PREVIEW_CHARS);
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head.to_string()
    }
}
