//! Format implementations
//!
//! This module contains the formats a [`crate::model::Document`] converts to and from.

pub mod json;
pub mod markdown;

pub use json::JsonFormat;
pub use markdown::{MarkdownFormat, PlainFormat};
