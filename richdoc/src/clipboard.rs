//! Clipboard adapter.
//!
//! Decides whether pasted content needs the engine at all and, when it does,
//! turns it into a normalized [`Document`] ready to insert. `None` means the
//! host editor can paste the content its own way.

use crate::formats::markdown::parse;
use crate::model::{Document, VariableDef};
use crate::normalize::normalize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static VARIABLE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^}]+\}\}").expect("valid regex"));

/// What the system clipboard offers on paste.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardPayload {
    /// Document JSON written by a copy from another editor instance.
    #[serde(default)]
    pub document_json: Option<String>,
    #[serde(default)]
    pub plain_text: String,
}

pub fn is_pasted_content_with_variables(text: &str) -> bool {
    VARIABLE_TOKEN_RE.is_match(text)
}

pub fn from_plain_text(
    text: &str,
    variables: &[VariableDef],
    markdown_enabled: bool,
) -> Option<Document> {
    if !is_pasted_content_with_variables(text) {
        return None;
    }
    Some(normalize(parse(text, variables, markdown_enabled)))
}

pub fn from_clipboard(
    payload: &ClipboardPayload,
    variables: &[VariableDef],
    markdown_enabled: bool,
) -> Option<Document> {
    if let Some(json) = payload.document_json.as_deref() {
        match serde_json::from_str::<Document>(json) {
            Ok(doc) => {
                tracing::debug!(blocks = doc.blocks().len(), "pasting structured document");
                return Some(normalize(doc));
            }
            Err(error) => {
                tracing::warn!(%error, "ignoring unreadable document on the clipboard");
            }
        }
    }
    from_plain_text(&payload.plain_text, variables, markdown_enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, EntityKey, EntityKind, InlineStyle, StyleRange};

    fn vars() -> Vec<VariableDef> {
        vec![VariableDef::new("first_name", "First name")]
    }

    #[test]
    fn detects_variable_tokens() {
        assert!(is_pasted_content_with_variables("Hi {{first_name}}"));
        assert!(!is_pasted_content_with_variables("Hi {{}} there"));
        assert!(!is_pasted_content_with_variables("no tokens"));
    }

    #[test]
    fn plain_text_without_tokens_is_left_to_the_editor() {
        assert_eq!(from_plain_text("hello", &vars(), true), None);
    }

    #[test]
    fn plain_text_with_tokens_becomes_a_document() {
        let doc = from_plain_text("Hi {{first_name}}\nbye", &vars(), true).unwrap();
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(doc.blocks()[0].text, "Hi First name");
        let entity = doc.entity_at(0, 3).unwrap();
        assert_eq!(entity.kind, EntityKind::Variable);
    }

    #[test]
    fn structured_payload_wins_and_is_cleaned() {
        let mut block = Block::plain("one\ntwo");
        block.add_entity(0, 3, EntityKey(5));
        let doc = Document::from_parts(vec![block], Default::default());
        let payload = ClipboardPayload {
            document_json: Some(serde_json::to_string(&doc).unwrap()),
            plain_text: "ignored".into(),
        };

        let pasted = from_clipboard(&payload, &vars(), true).unwrap();
        assert_eq!(pasted.blocks().len(), 2);
        assert!(!pasted.has_dangling_entities());
    }

    #[test]
    fn payload_ranges_past_the_text_are_clipped() {
        let json = r#"{"blocks":[{"text":"abc",
            "styleRanges":[{"offset":1,"length":18446744073709551615,"style":"BOLD"}],
            "entityRanges":[{"offset":2,"length":9,"key":0}]}]}"#;
        let payload = ClipboardPayload {
            document_json: Some(json.into()),
            plain_text: String::new(),
        };

        let pasted = from_clipboard(&payload, &vars(), true).unwrap();
        let block = &pasted.blocks()[0];
        assert_eq!(
            block.style_ranges,
            vec![StyleRange {
                offset: 1,
                length: 2,
                style: InlineStyle::Bold
            }]
        );
        assert!(block.entity_ranges.is_empty());
        assert!(!pasted.has_dangling_entities());
    }

    #[test]
    fn broken_payload_falls_back_to_text() {
        let payload = ClipboardPayload {
            document_json: Some("{not json".into()),
            plain_text: "{{first_name}}".into(),
        };
        let pasted = from_clipboard(&payload, &vars(), true).unwrap();
        assert_eq!(pasted.blocks()[0].text, "First name");

        let payload = ClipboardPayload {
            document_json: Some("{not json".into()),
            plain_text: "plain".into(),
        };
        assert_eq!(from_clipboard(&payload, &vars(), true), None);
    }
}
