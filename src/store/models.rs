//! Wire types returned by the godocs API.

use serde::{Deserialize, Serialize};

/// Tag identifier on the godocs server.
pub type TagId = i64;

/// A tag as known to the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTag {
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub tag_group: String,
    #[serde(default)]
    pub sort_order: i64,
}

/// A document entry from a search/listing response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreDocument {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub folder: String,
    pub ulid: String,
    pub document_type: String,
    pub full_text: String,
    pub ingress_time: String,
    pub url: String,
}

/// One page of the untagged-documents listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UntaggedPage {
    pub documents: Vec<StoreDocument>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Per-document processing status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentStatus {
    pub ulid: String,
    pub name: String,
    pub path: String,
    pub document_type: String,
    pub has_thumbnail: bool,
    #[serde(rename = "thumbnailURL")]
    pub thumbnail_url: String,
    pub has_text: bool,
    pub text_length: u64,
    #[serde(rename = "textURL")]
    pub text_url: String,
    #[serde(rename = "viewURL")]
    pub view_url: String,
    pub ingress_time: String,
    pub file_exists: bool,
    pub file_size_bytes: u64,
    pub tag_count: u32,
    pub document_date: String,
}

/// Raw document bytes as served by the store.
#[derive(Debug, Clone)]
pub struct DocumentContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
}
