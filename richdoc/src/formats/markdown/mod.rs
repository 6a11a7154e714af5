//! Markdown format implementation
//!
//! This module converts between a [`Document`] and markdown text extended with
//! the editor's own tokens.
//!
//! # Library Choice
//!
//! We use the `comrak` crate for the markdown grammar. Only the strikethrough and
//! autolink extensions are enabled; everything else a document cannot hold is
//! read back as plain lines of source text.
//!
//! # Element Mapping Table
//!
//! | Document element   | Markdown                    | Export Notes                        | Import Notes                           |
//! |--------------------|-----------------------------|-------------------------------------|----------------------------------------|
//! | Plain block        | Line of text                | One line per block                  | Each source line is one block          |
//! | Empty block        | Blank line                  | Written as an empty line            | Every blank line is kept               |
//! | Unordered item     | `- item`                    | Indented to the parent's content    | Depth capped at 2                      |
//! | Ordered item       | `1. item`                   | Numbered per level                  | Depth capped at 2                      |
//! | Checklist item     | `[clist:L|I]item[/clist]`   | Items of one run share a line       | Tags anywhere start a new block        |
//! | Atomic block       | `![name](url)`              | Alone on its line                   | An image alone on a line               |
//! | InlineContent:     |                             |                                     |                                        |
//! |   Bold             | `**bold**`                  | Whitespace kept outside markers     | `__bold__` too                         |
//! |   Italic           | `*italic*`                  |                                     | `_italic_` too                         |
//! |   Strikethrough    | `~~strike~~`                |                                     |                                        |
//! |   Variable         | `{{apiName}}`               |                                     | Unknown names stay text                |
//! |   Mention          | `[name|userId]`             | Name escaped                        |                                        |
//! |   Link             | `[text](url)`               | `<url>` when it has spaces          | Unsafe schemes stay text               |
//!
//! # Lossy Conversions
//!
//! - Headings, code, quotes and raw HTML → plain lines holding their source text
//! - Inline code → its literal text
//! - Depth beyond 2 → depth 2
//!
//! With markdown disabled ([`PlainFormat`]), only the custom tokens are read and
//! written; style markers are neither parsed nor produced.

pub(crate) mod inline;
pub mod parser;
pub mod serializer;

use crate::error::FormatError;
use crate::format::{Format, ParseContext};
use crate::model::Document;

pub use parser::parse;
pub use serializer::{serialize, serialize_with, SerializeOptions};

/// Format implementation for Markdown
pub struct MarkdownFormat;

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "CommonMark Markdown with variable, mention and checklist tokens"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str, context: &ParseContext) -> Result<Document, FormatError> {
        Ok(parse(source, &context.variables, context.markdown_enabled))
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(serialize(doc))
    }
}

/// The same tokens with markdown syntax switched off.
pub struct PlainFormat;

impl Format for PlainFormat {
    fn name(&self) -> &str {
        "plain"
    }

    fn description(&self) -> &str {
        "Plain text with variable, mention and checklist tokens"
    }

    fn file_extensions(&self) -> &[&str] {
        &["txt"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str, context: &ParseContext) -> Result<Document, FormatError> {
        Ok(parse(source, &context.variables, false))
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(serialize_with(doc, &SerializeOptions::plain()))
    }
}
