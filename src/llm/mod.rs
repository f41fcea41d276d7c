//! LLM integration for date inference.

mod client;

pub use client::{
    parse_inferred_date, truncate_chars, DateInference, LlmConfig, LlmError, OllamaClient,
    DEFAULT_ENDPOINT, DEFAULT_MODEL, MAX_INFERENCE_CHARS,
};
