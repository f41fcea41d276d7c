//! docinbox - keyboard-driven triage of untagged godocs documents.
//!
//! Serves one untagged document at a time, applies shortcut tags, and
//! enriches documents in the background with OCR text and an inferred date.

pub mod cli;
pub mod config;
pub mod llm;
pub mod ocr;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod thumbnail;
pub mod triage;
pub mod utils;

#[cfg(test)]
pub mod testing;
