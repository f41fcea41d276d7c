//! LLM client for document date inference.
//!
//! Supports Ollama API for local LLM inference.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default Ollama endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default model used for date inference.
pub const DEFAULT_MODEL: &str = "gemma3:4b";

/// Timeout for a single generate call.
pub const INFERENCE_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of characters of document text sent to the model.
pub const MAX_INFERENCE_CHARS: usize = 2000;

/// Sentinel the model is told to answer when no date can be determined.
pub const NO_DATE_SENTINEL: &str = "NONE";

/// Prompt for extracting a document date.
pub const DATE_PROMPT: &str = r#"Extract the document date from the following text. The document date is the date the document was created, issued, or refers to (e.g. invoice date, letter date, statement date). Return ONLY the date in YYYY-MM-DD format. If no date can be determined, return "NONE".

Text:
{content}

Date:"#;

/// Endpoint/model selection for date inference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama API endpoint (default: http://localhost:11434)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Model to use (default: gemma3:4b)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl LlmConfig {
    /// Configured endpoint, or the default when unset or blank.
    pub fn resolved_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Configured model, or the default when unset or blank.
    pub fn resolved_model(&self) -> &str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }
}

/// Asks a language model for the date a document refers to.
#[async_trait]
pub trait DateInference: Send + Sync {
    /// Return the model's raw answer for `text`.
    ///
    /// Interpreting the answer is left to [`parse_inferred_date`]; an answer
    /// that is not a calendar date is not an error.
    async fn infer_date(&self, endpoint: &str, model: &str, text: &str)
        -> Result<String, LlmError>;
}

/// Ollama-backed [`DateInference`].
pub struct OllamaClient {
    client: Client,
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new() -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(INFERENCE_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DateInference for OllamaClient {
    async fn infer_date(
        &self,
        endpoint: &str,
        model: &str,
        text: &str,
    ) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model,
            prompt: DATE_PROMPT.replace("{content}", text),
            stream: false,
        };

        let url = format!("{}/api/generate", endpoint.trim_end_matches('/'));
        debug!("Requesting date inference from {} ({})", url, model);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let ollama_resp: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(ollama_resp.response)
    }
}

/// Interpret a model answer as a document date.
///
/// Only a bare `YYYY-MM-DD` calendar date is accepted. The `NONE` sentinel,
/// an empty answer, and anything else that does not parse yield `None`.
pub fn parse_inferred_date(raw: &str) -> Option<NaiveDate> {
    let answer = raw.trim();
    if answer.is_empty() || answer.eq_ignore_ascii_case(NO_DATE_SENTINEL) {
        return None;
    }
    // chrono accepts unpadded fields, the expected form does not
    let bytes = answer.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(answer, "%Y-%m-%d").ok()
}

/// First `max_chars` characters of `text` (UTF-8 safe).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Errors that can occur during LLM operations.
#[derive(Debug)]
pub enum LlmError {
    /// Failed to connect to LLM service
    Connection(String),
    /// API returned an error
    Api(String),
    /// Failed to parse response
    Parse(String),
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Connection(msg) => write!(f, "Connection error: {}", msg),
            LlmError::Api(msg) => write!(f, "API error: {}", msg),
            LlmError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for LlmError {}
