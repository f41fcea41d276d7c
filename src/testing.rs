//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Notify;

use crate::llm::{DateInference, LlmError};
use crate::ocr::{OcrError, TextExtractor};
use crate::store::{
    DocumentContent, DocumentStatus, DocumentStore, StoreDocument, StoreError, StoreTag, TagId,
    UntaggedPage,
};
use crate::thumbnail::{ThumbnailError, ThumbnailRenderer, ThumbnailStyle};

pub fn tag(id: TagId, name: &str, group: &str) -> StoreTag {
    StoreTag {
        id,
        name: name.to_string(),
        color: "#888".to_string(),
        tag_group: group.to_string(),
        sort_order: 0,
    }
}

pub fn document(ulid: &str, name: &str, doc_type: &str) -> StoreDocument {
    StoreDocument {
        ulid: ulid.to_string(),
        name: name.to_string(),
        document_type: doc_type.to_string(),
        ..Default::default()
    }
}

#[derive(Default)]
struct StoreState {
    catalog: HashMap<TagId, StoreTag>,
    doc_tags: HashMap<String, Vec<StoreTag>>,
    texts: HashMap<String, String>,
    statuses: HashMap<String, DocumentStatus>,
    contents: HashMap<String, DocumentContent>,
    thumbnails: HashMap<String, DocumentContent>,
    untagged: Vec<StoreDocument>,
    groups: Vec<String>,
    added: Vec<(String, TagId)>,
    removed: Vec<(String, TagId)>,
    uploaded_texts: Vec<(String, String)>,
    dates: Vec<(String, NaiveDate)>,
    created: Vec<(String, String, Option<String>)>,
    rejected_tags: HashSet<TagId>,
    fail_tag_reads: bool,
    fail_removals: bool,
    fail_status: bool,
    fail_untagged: bool,
    fail_text_upload: bool,
    fail_date_update: bool,
    downloads: usize,
    calls: usize,
}

/// [`DocumentStore`] backed by maps, with switches for failure injection.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

fn refused(operation: &'static str) -> StoreError {
    StoreError::Status {
        operation,
        status: 500,
        body: "injected failure".to_string(),
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Call inside a trait method: counts the call.
    fn call<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        self.with(|s| {
            s.calls += 1;
            f(s)
        })
    }

    /// Set a document's tags and make them known to the catalog.
    pub fn set_tags(&self, doc_id: &str, tags: Vec<StoreTag>) {
        self.with(|s| {
            for t in &tags {
                s.catalog.entry(t.id).or_insert_with(|| t.clone());
            }
            s.doc_tags.insert(doc_id.to_string(), tags);
        });
    }

    pub fn add_catalog_tag(&self, tag: StoreTag) {
        self.with(|s| {
            s.catalog.insert(tag.id, tag);
        });
    }

    pub fn tags_of(&self, doc_id: &str) -> Vec<TagId> {
        self.with(|s| {
            s.doc_tags
                .get(doc_id)
                .map(|tags| tags.iter().map(|t| t.id).collect())
                .unwrap_or_default()
        })
    }

    pub fn set_text(&self, doc_id: &str, text: &str) {
        self.with(|s| {
            s.texts.insert(doc_id.to_string(), text.to_string());
        });
    }

    pub fn set_status(&self, doc_id: &str, status: DocumentStatus) {
        self.with(|s| {
            s.statuses.insert(doc_id.to_string(), status);
        });
    }

    pub fn set_content(&self, doc_id: &str, bytes: &[u8], content_type: &str) {
        self.with(|s| {
            s.contents.insert(
                doc_id.to_string(),
                DocumentContent {
                    bytes: bytes.to_vec(),
                    content_type: content_type.to_string(),
                },
            );
        });
    }

    pub fn set_thumbnail(&self, doc_id: &str, bytes: &[u8], content_type: &str) {
        self.with(|s| {
            s.thumbnails.insert(
                doc_id.to_string(),
                DocumentContent {
                    bytes: bytes.to_vec(),
                    content_type: content_type.to_string(),
                },
            );
        });
    }

    pub fn set_untagged(&self, docs: Vec<StoreDocument>) {
        self.with(|s| s.untagged = docs);
    }

    pub fn set_groups(&self, groups: &[&str]) {
        self.with(|s| s.groups = groups.iter().map(|g| g.to_string()).collect());
    }

    pub fn reject_tag(&self, tag_id: TagId) {
        self.with(|s| {
            s.rejected_tags.insert(tag_id);
        });
    }

    pub fn fail_tag_reads(&self) {
        self.with(|s| s.fail_tag_reads = true);
    }

    pub fn fail_removals(&self) {
        self.with(|s| s.fail_removals = true);
    }

    pub fn fail_status(&self) {
        self.with(|s| s.fail_status = true);
    }

    pub fn fail_untagged(&self) {
        self.with(|s| s.fail_untagged = true);
    }

    pub fn fail_text_upload(&self) {
        self.with(|s| s.fail_text_upload = true);
    }

    pub fn fail_date_update(&self) {
        self.with(|s| s.fail_date_update = true);
    }

    pub fn added_tags(&self) -> Vec<(String, TagId)> {
        self.with(|s| s.added.clone())
    }

    pub fn removed_tags(&self) -> Vec<(String, TagId)> {
        self.with(|s| s.removed.clone())
    }

    pub fn uploaded_texts(&self) -> Vec<(String, String)> {
        self.with(|s| s.uploaded_texts.clone())
    }

    pub fn date_updates(&self) -> Vec<(String, NaiveDate)> {
        self.with(|s| s.dates.clone())
    }

    pub fn created_tags(&self) -> Vec<(String, String, Option<String>)> {
        self.with(|s| s.created.clone())
    }

    pub fn download_count(&self) -> usize {
        self.with(|s| s.downloads)
    }

    pub fn call_count(&self) -> usize {
        self.with(|s| s.calls)
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn list_tags(&self) -> Result<Vec<StoreTag>, StoreError> {
        self.call(|s| {
            let mut tags: Vec<StoreTag> = s.catalog.values().cloned().collect();
            tags.sort_by_key(|t| t.id);
            Ok(tags)
        })
    }

    async fn fetch_untagged(&self, page: u32, page_size: u32) -> Result<UntaggedPage, StoreError> {
        self.call(|s| {
            if s.fail_untagged {
                return Err(refused("fetch untagged"));
            }
            let size = page_size.max(1) as usize;
            let start = (page.max(1) as usize - 1) * size;
            Ok(UntaggedPage {
                documents: s.untagged.iter().skip(start).take(size).cloned().collect(),
                page,
                page_size,
                total_count: s.untagged.len() as u64,
                ..Default::default()
            })
        })
    }

    async fn fetch_status(&self, doc_id: &str) -> Result<DocumentStatus, StoreError> {
        self.call(|s| {
            if s.fail_status {
                return Err(refused("fetch status"));
            }
            s.statuses
                .get(doc_id)
                .cloned()
                .ok_or_else(|| refused("fetch status"))
        })
    }

    async fn fetch_text(&self, doc_id: &str) -> Result<String, StoreError> {
        self.call(|s| Ok(s.texts.get(doc_id).cloned().unwrap_or_default()))
    }

    async fn upload_text(&self, doc_id: &str, text: &str) -> Result<(), StoreError> {
        self.call(|s| {
            if s.fail_text_upload {
                return Err(refused("upload text"));
            }
            s.texts.insert(doc_id.to_string(), text.to_string());
            s.uploaded_texts.push((doc_id.to_string(), text.to_string()));
            Ok(())
        })
    }

    async fn update_date(&self, doc_id: &str, date: NaiveDate) -> Result<(), StoreError> {
        self.call(|s| {
            if s.fail_date_update {
                return Err(refused("update date"));
            }
            s.dates.push((doc_id.to_string(), date));
            Ok(())
        })
    }

    async fn fetch_document_tags(&self, doc_id: &str) -> Result<Vec<StoreTag>, StoreError> {
        self.call(|s| {
            if s.fail_tag_reads {
                return Err(refused("fetch document tags"));
            }
            Ok(s.doc_tags.get(doc_id).cloned().unwrap_or_default())
        })
    }

    async fn add_tag(&self, doc_id: &str, tag_id: TagId) -> Result<(), StoreError> {
        self.call(|s| {
            if s.rejected_tags.contains(&tag_id) {
                return Err(refused("add tag"));
            }
            s.added.push((doc_id.to_string(), tag_id));
            if let Some(known) = s.catalog.get(&tag_id).cloned() {
                let tags = s.doc_tags.entry(doc_id.to_string()).or_default();
                if !tags.iter().any(|t| t.id == tag_id) {
                    tags.push(known);
                }
            }
            Ok(())
        })
    }

    async fn remove_tag(&self, doc_id: &str, tag_id: TagId) -> Result<(), StoreError> {
        self.call(|s| {
            if s.fail_removals {
                return Err(refused("remove tag"));
            }
            s.removed.push((doc_id.to_string(), tag_id));
            if let Some(tags) = s.doc_tags.get_mut(doc_id) {
                tags.retain(|t| t.id != tag_id);
            }
            Ok(())
        })
    }

    async fn list_tag_groups(&self) -> Result<Vec<String>, StoreError> {
        self.call(|s| Ok(s.groups.clone()))
    }

    async fn create_tag(
        &self,
        name: &str,
        color: &str,
        group: Option<&str>,
    ) -> Result<StoreTag, StoreError> {
        self.call(|s| {
            let id = s.catalog.keys().max().copied().unwrap_or(0) + 1;
            let created = StoreTag {
                id,
                name: name.to_string(),
                color: color.to_string(),
                tag_group: group.unwrap_or_default().to_string(),
                sort_order: 0,
            };
            s.catalog.insert(id, created.clone());
            s.created
                .push((name.to_string(), color.to_string(), group.map(str::to_string)));
            Ok(created)
        })
    }

    async fn download(&self, doc_id: &str) -> Result<DocumentContent, StoreError> {
        self.call(|s| {
            s.downloads += 1;
            s.contents
                .get(doc_id)
                .cloned()
                .ok_or_else(|| refused("download"))
        })
    }

    async fn fetch_thumbnail(&self, doc_id: &str) -> Result<DocumentContent, StoreError> {
        self.call(|s| {
            s.thumbnails
                .get(doc_id)
                .cloned()
                .ok_or_else(|| refused("fetch thumbnail"))
        })
    }
}

/// What [`StubExtractor`] answers.
#[derive(Debug, Clone)]
pub enum ExtractResult {
    Text(String),
    Unsupported,
    Fail,
}

/// A call seen by [`StubExtractor`].
#[derive(Debug, Clone)]
pub struct ExtractCall {
    pub path: PathBuf,
    pub doc_type: String,
    pub file_existed: bool,
}

pub struct StubExtractor {
    result: ExtractResult,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<ExtractCall>>,
}

impl StubExtractor {
    pub fn text(text: &str) -> Self {
        Self::answering(ExtractResult::Text(text.to_string()))
    }

    pub fn answering(result: ExtractResult) -> Self {
        Self {
            result,
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Hold every extraction until the returned [`Notify`] is signalled.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn calls(&self) -> Vec<ExtractCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract(&self, path: &Path, doc_type: &str) -> Result<String, OcrError> {
        self.calls.lock().unwrap().push(ExtractCall {
            path: path.to_path_buf(),
            doc_type: doc_type.to_string(),
            file_existed: path.is_file(),
        });
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.result {
            ExtractResult::Text(text) => Ok(text.clone()),
            ExtractResult::Unsupported => Err(OcrError::UnsupportedType(doc_type.to_string())),
            ExtractResult::Fail => Err(OcrError::OcrFailed("stub failure".to_string())),
        }
    }
}

/// [`DateInference`] with a fixed answer that records what it was sent.
pub struct StubInference {
    answer: Option<String>,
    requests: Mutex<Vec<(String, String, String)>>,
}

impl StubInference {
    pub fn answer(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a connection error.
    pub fn unreachable() -> Self {
        Self {
            answer: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(endpoint, model, text)` of every call.
    pub fn requests(&self) -> Vec<(String, String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DateInference for StubInference {
    async fn infer_date(&self, endpoint: &str, model: &str, text: &str) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push((
            endpoint.to_string(),
            model.to_string(),
            text.to_string(),
        ));
        self.answer
            .clone()
            .ok_or_else(|| LlmError::Connection("connection refused".to_string()))
    }
}

const RENDER_COMPLETE: &[u8] = b"COMPLETE";

/// [`ThumbnailRenderer`] that writes a marker file, optionally slowly.
pub struct StubRenderer {
    delay: Option<Duration>,
    fail: bool,
    renders: Arc<AtomicUsize>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self {
            delay: None,
            fail: false,
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Writes half the output, sleeps for `delay`, then finishes.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn render_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.renders)
    }

    /// Whether `path` holds a fully written stub preview.
    pub fn is_complete(path: &Path) -> bool {
        std::fs::read(path)
            .map(|bytes| bytes.ends_with(RENDER_COMPLETE))
            .unwrap_or(false)
    }
}

impl ThumbnailRenderer for StubRenderer {
    fn render(
        &self,
        _source: &Path,
        dest: &Path,
        _width: u32,
        _style: ThumbnailStyle,
    ) -> Result<(), ThumbnailError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            std::fs::write(dest, b"PARTIAL")?;
            return Err(ThumbnailError::Render("stub failure".to_string()));
        }
        if let Some(delay) = self.delay {
            std::fs::write(dest, b"PARTIAL")?;
            std::thread::sleep(delay);
        }
        let mut out = b"PNG ".to_vec();
        out.extend_from_slice(RENDER_COMPLETE);
        std::fs::write(dest, out)?;
        Ok(())
    }
}

/// An [`Inbox`](crate::triage::Inbox) over a [`FakeStore`] with shortcuts
/// `l` → 18 "letters" and `t` → 3 "tax", and catalog tags 18, 3 and 5.
pub struct TestInbox {
    pub store: Arc<FakeStore>,
    pub extractor: Arc<StubExtractor>,
    pub inbox: Arc<crate::triage::Inbox>,
    pub dir: tempfile::TempDir,
}

pub fn shortcut(key: &str, tag_id: TagId, name: &str) -> crate::config::ShortcutConfig {
    crate::config::ShortcutConfig {
        key: key.to_string(),
        tag_id,
        name: name.to_string(),
        color: "#888".to_string(),
    }
}

pub async fn test_inbox(extractor: StubExtractor) -> TestInbox {
    let dir = tempfile::tempdir().unwrap();
    let mut config = crate::config::Config::example();
    config.godocs_server = "http://docs.local".to_string();
    config.thumb_dir = Some(dir.path().join("thumbs").display().to_string());
    config.scratch_dir = Some(dir.path().join("scratch").display().to_string());
    let mut settings = crate::config::Settings::from_config(&config);
    settings.shortcuts = vec![shortcut("l", 18, "letters"), shortcut("t", 3, "tax")];

    let store = Arc::new(FakeStore::new());
    store.add_catalog_tag(tag(18, "letters", "Kind"));
    store.add_catalog_tag(tag(3, "tax", ""));
    store.add_catalog_tag(tag(5, "bank", "Kind"));

    let extractor = Arc::new(extractor);
    let inbox = crate::triage::Inbox::start(
        &settings,
        store.clone(),
        extractor.clone(),
        Arc::new(StubInference::answer("2024-03-05")),
        Arc::new(StubRenderer::new()),
    );
    inbox.refresh_tags().await.unwrap();
    TestInbox {
        store,
        extractor,
        inbox: Arc::new(inbox),
        dir,
    }
}
