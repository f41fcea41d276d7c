//! Remote document store access.
//!
//! The triage core only consumes the store through the [`DocumentStore`]
//! trait. [`GodocsClient`] is the HTTP implementation used in production;
//! tests substitute in-memory fakes.

mod client;
mod models;

pub use client::GodocsClient;
pub use models::{DocumentContent, DocumentStatus, StoreDocument, StoreTag, TagId, UntaggedPage};

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors from the remote document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{operation} failed ({status}): {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {what}: {message}")]
    Decode { what: &'static str, message: String },

    #[error("{0}")]
    Other(String),
}

/// Operations the triage core needs from the document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every tag defined on the server.
    async fn list_tags(&self) -> Result<Vec<StoreTag>, StoreError>;

    /// Fetch one page of documents that carry no tags.
    async fn fetch_untagged(&self, page: u32, page_size: u32) -> Result<UntaggedPage, StoreError>;

    /// Fetch text/thumbnail/date status for a document.
    async fn fetch_status(&self, doc_id: &str) -> Result<DocumentStatus, StoreError>;

    /// Fetch the extracted full text. A document without text yields "".
    async fn fetch_text(&self, doc_id: &str) -> Result<String, StoreError>;

    /// Replace the document's extracted text.
    async fn upload_text(&self, doc_id: &str, text: &str) -> Result<(), StoreError>;

    /// Set the document date.
    async fn update_date(&self, doc_id: &str, date: NaiveDate) -> Result<(), StoreError>;

    /// Current tags on a document. A document without tags yields an empty list.
    async fn fetch_document_tags(&self, doc_id: &str) -> Result<Vec<StoreTag>, StoreError>;

    async fn add_tag(&self, doc_id: &str, tag_id: TagId) -> Result<(), StoreError>;

    async fn remove_tag(&self, doc_id: &str, tag_id: TagId) -> Result<(), StoreError>;

    /// Names of the tag groups known to the server.
    async fn list_tag_groups(&self) -> Result<Vec<String>, StoreError>;

    /// Create a new tag, optionally inside a group.
    async fn create_tag(
        &self,
        name: &str,
        color: &str,
        group: Option<&str>,
    ) -> Result<StoreTag, StoreError>;

    /// Download the raw document bytes with their content type.
    async fn download(&self, doc_id: &str) -> Result<DocumentContent, StoreError>;

    /// The store's own small thumbnail with its content type.
    async fn fetch_thumbnail(&self, doc_id: &str) -> Result<DocumentContent, StoreError>;
}
