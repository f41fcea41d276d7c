//! HTTP client for the godocs document server.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{
    DocumentContent, DocumentStatus, DocumentStore, StoreError, StoreTag, TagId, UntaggedPage,
};

/// Timeout applied to every store request.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the godocs REST API.
pub struct GodocsClient {
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct TextBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct DateBody {
    date: String,
}

#[derive(Serialize)]
struct AddTagBody {
    tag_id: TagId,
}

#[derive(Serialize)]
struct CreateTagBody<'a> {
    name: &'a str,
    color: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_group: Option<&'a str>,
}

#[derive(serde::Deserialize)]
struct TextResponse {
    #[serde(default)]
    text: Option<String>,
}

impl GodocsClient {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(STORE_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// The server URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        what: &'static str,
    ) -> Result<T, StoreError> {
        let resp = self.client.get(self.url(path)).send().await?;
        let resp = check_status(resp, what).await?;
        resp.json::<T>().await.map_err(|e| StoreError::Decode {
            what,
            message: e.to_string(),
        })
    }

    /// GET raw bytes, keeping the response content type.
    async fn get_content(
        &self,
        path: &str,
        operation: &'static str,
    ) -> Result<DocumentContent, StoreError> {
        let resp = self.client.get(self.url(path)).send().await?;
        let resp = check_status(resp, operation).await?;
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = resp.bytes().await?.to_vec();
        Ok(DocumentContent {
            bytes,
            content_type,
        })
    }
}

/// Turn a non-2xx response into [`StoreError::Status`], keeping the body for logs.
async fn check_status(resp: Response, operation: &'static str) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status {
        operation,
        status: status.as_u16(),
        body,
    })
}

fn encode(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

#[async_trait]
impl DocumentStore for GodocsClient {
    async fn list_tags(&self) -> Result<Vec<StoreTag>, StoreError> {
        let tags: Option<Vec<StoreTag>> = self.get_json("/api/tags", "tags").await?;
        Ok(tags.unwrap_or_default())
    }

    async fn fetch_untagged(&self, page: u32, page_size: u32) -> Result<UntaggedPage, StoreError> {
        let resp = self
            .client
            .get(self.url("/api/documents/untagged"))
            .query(&[("page", page), ("pageSize", page_size)])
            .send()
            .await?;
        let resp = check_status(resp, "untagged listing").await?;
        resp.json().await.map_err(|e| StoreError::Decode {
            what: "untagged listing",
            message: e.to_string(),
        })
    }

    async fn fetch_status(&self, doc_id: &str) -> Result<DocumentStatus, StoreError> {
        self.get_json(
            &format!("/api/document/{}/status", encode(doc_id)),
            "document status",
        )
        .await
    }

    async fn fetch_text(&self, doc_id: &str) -> Result<String, StoreError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/document/{}/text", encode(doc_id))))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(String::new());
        }
        let resp = check_status(resp, "fetch text").await?;
        let body: TextResponse = resp.json().await.map_err(|e| StoreError::Decode {
            what: "document text",
            message: e.to_string(),
        })?;
        Ok(body.text.unwrap_or_default())
    }

    async fn upload_text(&self, doc_id: &str, text: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .put(self.url(&format!("/api/document/{}/text", encode(doc_id))))
            .json(&TextBody { text })
            .send()
            .await?;
        check_status(resp, "upload text").await?;
        debug!("Uploaded {} chars of text for {}", text.len(), doc_id);
        Ok(())
    }

    async fn update_date(&self, doc_id: &str, date: NaiveDate) -> Result<(), StoreError> {
        let resp = self
            .client
            .put(self.url(&format!("/api/document/{}/date", encode(doc_id))))
            .json(&DateBody {
                date: date.format("%Y-%m-%d").to_string(),
            })
            .send()
            .await?;
        check_status(resp, "update date").await?;
        Ok(())
    }

    async fn fetch_document_tags(&self, doc_id: &str) -> Result<Vec<StoreTag>, StoreError> {
        // godocs answers `null` for a document without tags
        let tags: Option<Vec<StoreTag>> = self
            .get_json(
                &format!("/api/documents/{}/tags", encode(doc_id)),
                "document tags",
            )
            .await?;
        Ok(tags.unwrap_or_default())
    }

    async fn add_tag(&self, doc_id: &str, tag_id: TagId) -> Result<(), StoreError> {
        let resp = self
            .client
            .post(self.url(&format!("/api/documents/{}/tags", encode(doc_id))))
            .json(&AddTagBody { tag_id })
            .send()
            .await?;
        check_status(resp, "add tag").await?;
        Ok(())
    }

    async fn remove_tag(&self, doc_id: &str, tag_id: TagId) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.url(&format!(
                "/api/documents/{}/tags/{}",
                encode(doc_id),
                tag_id
            )))
            .send()
            .await?;
        check_status(resp, "remove tag").await?;
        Ok(())
    }

    async fn list_tag_groups(&self) -> Result<Vec<String>, StoreError> {
        let groups: Option<Vec<String>> = self.get_json("/api/tags/groups", "tag groups").await?;
        Ok(groups.unwrap_or_default())
    }

    async fn create_tag(
        &self,
        name: &str,
        color: &str,
        group: Option<&str>,
    ) -> Result<StoreTag, StoreError> {
        let resp = self
            .client
            .post(self.url("/api/tags"))
            .json(&CreateTagBody {
                name,
                color,
                tag_group: group.filter(|g| !g.is_empty()),
            })
            .send()
            .await?;
        let resp = check_status(resp, "create tag").await?;
        resp.json().await.map_err(|e| StoreError::Decode {
            what: "created tag",
            message: e.to_string(),
        })
    }

    async fn download(&self, doc_id: &str) -> Result<DocumentContent, StoreError> {
        self.get_content(&format!("/document/view/{}", encode(doc_id)), "download")
            .await
    }

    async fn fetch_thumbnail(&self, doc_id: &str) -> Result<DocumentContent, StoreError> {
        self.get_content(
            &format!("/api/document/{}/thumbnail", encode(doc_id)),
            "fetch thumbnail",
        )
        .await
    }
}
