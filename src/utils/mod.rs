//! Shared utility functions.
//!
//! - `mime`: content type to file extension mapping

mod mime;

pub use mime::{mime_to_extension, scratch_extension};
