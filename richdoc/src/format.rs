//! Format trait definition
//!
//! This module defines the core Format trait that all format implementations must implement.
//! The trait provides a uniform interface for parsing and serializing documents.

use crate::error::FormatError;
use crate::model::{Document, VariableDef};

/// Inputs a parser needs besides the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContext {
    /// Variables `{{apiName}}` tokens resolve against. Unknown names stay text.
    pub variables: Vec<VariableDef>,
    /// Whether markdown syntax is honored. When off, only the custom tokens are read.
    pub markdown_enabled: bool,
}

impl Default for ParseContext {
    fn default() -> Self {
        Self {
            variables: Vec::new(),
            markdown_enabled: true,
        }
    }
}

impl ParseContext {
    pub fn with_variables(variables: Vec<VariableDef>) -> Self {
        Self {
            variables,
            ..Self::default()
        }
    }
}

/// Trait for document formats
///
/// Implementors provide conversion between a string representation and a [`Document`].
/// Formats can support parsing, serialization, or both.
///
/// # Examples
///
/// ```ignore
/// struct MyFormat;
///
/// impl Format for MyFormat {
///     fn name(&self) -> &str {
///         "my-format"
///     }
///
///     fn supports_parsing(&self) -> bool {
///         true
///     }
///
///     fn parse(&self, source: &str, context: &ParseContext) -> Result<Document, FormatError> {
///         todo!()
///     }
/// }
/// ```
pub trait Format: Send + Sync {
    /// The name of this format (e.g., "markdown", "json")
    fn name(&self) -> &str;

    /// Optional description of this format
    fn description(&self) -> &str {
        ""
    }

    /// File extensions associated with this format, without the leading dot.
    ///
    /// Used for automatic format detection from filenames.
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    /// Whether this format supports parsing (source → Document)
    fn supports_parsing(&self) -> bool {
        false
    }

    /// Whether this format supports serialization (Document → source)
    fn supports_serialization(&self) -> bool {
        false
    }

    /// Parse source text into a Document
    ///
    /// Default implementation returns NotSupported error.
    fn parse(&self, _source: &str, _context: &ParseContext) -> Result<Document, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not support parsing",
            self.name()
        )))
    }

    /// Serialize a Document into source text
    ///
    /// Default implementation returns NotSupported error.
    fn serialize(&self, _doc: &Document) -> Result<String, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not support serialization",
            self.name()
        )))
    }
}
