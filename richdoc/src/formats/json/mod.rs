//! JSON format: the document model as serde writes it.
//!
//! This is the form a document takes on the clipboard and in storage. Parsing
//! does not normalize; pass the result through [`crate::normalize`] when the
//! source is untrusted.

use crate::error::FormatError;
use crate::format::{Format, ParseContext};
use crate::model::Document;

/// Format implementation for document JSON
#[derive(Debug, Clone, Copy)]
pub struct JsonFormat {
    pretty: bool,
}

impl Default for JsonFormat {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonFormat {
    /// Single-line output, as placed on the clipboard.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Format for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Document model as JSON"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str, _context: &ParseContext) -> Result<Document, FormatError> {
        Ok(serde_json::from_str(source)?)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(doc)?
        } else {
            serde_json::to_string(doc)?
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, BlockKind, ChecklistRef};

    #[test]
    fn block_kind_is_tagged_by_type() {
        let mut block = Block::plain("Buy milk");
        block.kind = BlockKind::ChecklistItem(ChecklistRef::new("l1", "i1"));
        let doc = Document::from_parts(vec![block], Default::default());

        let json = JsonFormat::compact().serialize(&doc).unwrap();
        insta::assert_snapshot!(json, @r#"{"blocks":[{"kind":{"type":"checklist-item","listApiName":"l1","itemApiName":"i1"},"depth":0,"text":"Buy milk","styleRanges":[],"entityRanges":[]}],"entities":{},"nextEntityKey":0}"#);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let result = JsonFormat::default().parse("{\"blocks\": 3}", &ParseContext::default());
        assert!(matches!(result, Err(FormatError::Json(_))));
    }
}
