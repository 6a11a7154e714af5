//! CLI-specific transforms
//!
//! Views of a parsed document for `richdoc inspect`. Each transform takes the
//! source text, runs it through the parser (and optionally the normalizer), and
//! renders one aspect of the result.
//!
//! - `blocks`: one line per block with kind, depth, text and annotations
//! - `json`: the document model as JSON
//! - `plain-text`: block texts joined with newlines
//! - `entities`: the entity map as JSON
//! - `roundtrip`: the markdown the document serializes back to
//!
//! Example: `richdoc inspect notes.md blocks --normalize`

use richdoc::model::{Document, EntityData, InlineStyle};
use richdoc::{normalize, parse, serialize, ParseContext};
use std::fmt::Write;

/// All available inspect transforms
pub const AVAILABLE_TRANSFORMS: &[&str] = &["blocks", "json", "plain-text", "entities", "roundtrip"];

/// Execute a named transform on markdown source
///
/// # Returns
///
/// The transformed output as a string, or an error message
pub fn execute_transform(
    source: &str,
    transform_name: &str,
    context: &ParseContext,
    normalized: bool,
) -> Result<String, String> {
    let mut doc = parse(source, &context.variables, context.markdown_enabled);
    if normalized {
        doc = normalize(doc);
    }

    match transform_name {
        "blocks" => Ok(blocks_table(&doc)),
        "json" => serde_json::to_string_pretty(&doc)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        "plain-text" => Ok(doc.plain_text()),
        "entities" => serde_json::to_string_pretty(doc.entities())
            .map_err(|e| format!("JSON serialization failed: {e}")),
        "roundtrip" => Ok(serialize(&doc)),
        _ => Err(format!(
            "Unknown transform: {transform_name}. Available: {}",
            AVAILABLE_TRANSFORMS.join(", ")
        )),
    }
}

fn style_letter(style: InlineStyle) -> char {
    match style {
        InlineStyle::Bold => 'B',
        InlineStyle::Italic => 'I',
        InlineStyle::Strikethrough => 'S',
    }
}

fn blocks_table(doc: &Document) -> String {
    let mut output = String::new();
    for (index, view) in doc.structural_view().into_iter().enumerate() {
        let kind = match &view.kind {
            richdoc::model::BlockKind::ChecklistItem(ids) => {
                format!("checklist({}|{})", ids.list_api_name, ids.item_api_name)
            }
            other => format!("{other:?}"),
        };
        let _ = writeln!(
            output,
            "{index:>3} {kind:<20} d{} {:?}",
            view.depth, view.text
        );
        for range in &view.style_ranges {
            let _ = writeln!(
                output,
                "      {} {}..{}",
                style_letter(range.style),
                range.offset,
                range.end()
            );
        }
        for (offset, length, entity) in &view.entities {
            let label = match entity.as_ref().map(|entity| &entity.data) {
                Some(EntityData::Variable { api_name, .. }) => format!("variable {api_name}"),
                Some(EntityData::Mention { user_id, .. }) => format!("mention {user_id}"),
                Some(EntityData::Link { url, .. }) => format!("link {url}"),
                Some(EntityData::Attachment(token)) => format!("attachment {}", token.url),
                None => "dangling".to_string(),
            };
            let end = offset.saturating_add(*length);
            let _ = writeln!(output, "      @ {offset}..{end} {label}");
        }
    }
    output
}
