//! Checklist tags: `[clist:LIST|ITEM]label[/clist]`.
//!
//! Checklists are not a markdown construct. Each item is written as a pair of
//! pseudo tags around its label, and consecutive items of one list sit next to
//! each other on a single line:
//!
//! ```text
//! Before the list
//! [clist:groceries|milk]Buy milk[/clist][clist:groceries|eggs]Eggs[/clist]
//! ```
//!
//! This module holds the textual passes around the parser and serializer
//! ([`wrap_for_parsing`], [`extract_checklists`]), the block level grammar the
//! parser applies to its lines, and the id lifecycle rules.

use crate::model::{Block, BlockKind, ChecklistRef};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;

pub const CLOSE_TAG: &str = "[/clist]";

static WRAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|\[/clist\]|\\)?\[clist:").expect("valid regex"));

static OPEN_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[clist:([^\]|\n]+)\|([^\]\n]+)\]").expect("valid regex"));

static ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[clist:([^\]|\n]+)\|([^\]\n]+)\](.*?)\[/clist\]").expect("valid regex")
});

/// One checklist item as found in serialized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistEntry {
    pub list_api_name: String,
    pub item_api_name: String,
    pub value: String,
}

pub fn open_tag(checklist: &ChecklistRef) -> String {
    format!(
        "[clist:{}|{}]",
        checklist.list_api_name, checklist.item_api_name
    )
}

/// Move every opening tag onto its own line.
///
/// Tags that already start a line, directly follow a closing tag, or are
/// escaped with a backslash are left alone, so adjacent items of one list stay
/// together.
pub fn wrap_for_parsing(text: &str) -> Cow<'_, str> {
    WRAP_RE.replace_all(text, |caps: &Captures<'_>| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            format!("\n{}", &caps[0])
        }
    })
}

/// Every `[clist:LIST|ITEM]value[/clist]` occurrence, in order.
///
/// `value` is returned as written, markdown included.
pub fn extract_checklists(text: &str) -> Vec<ChecklistEntry> {
    ITEM_RE
        .captures_iter(text)
        .map(|caps| ChecklistEntry {
            list_api_name: caps[1].trim().to_string(),
            item_api_name: caps[2].trim().to_string(),
            value: caps[3].to_string(),
        })
        .collect()
}

fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Turn lines that open with a checklist tag into checklist item blocks.
///
/// A tag whose close sits on a later line swallows those lines, joined with a
/// space. Tags that are never closed stay literal text.
pub(crate) fn split_checklist_blocks(blocks: Vec<Block>) -> Vec<Block> {
    let mut out = Vec::with_capacity(blocks.len());
    let mut index = 0;
    while index < blocks.len() {
        let block = &blocks[index];
        if block.kind == BlockKind::Plain && OPEN_TAG_RE.is_match(&block.text) {
            let mut merged = block.clone();
            let mut last = index;
            while !merged.text.contains(CLOSE_TAG) {
                match blocks.get(last + 1) {
                    Some(next) if next.kind == BlockKind::Plain && !next.is_empty() => {
                        merged.push_text(" ", &[]);
                        merged.append(next);
                        last += 1;
                    }
                    _ => break,
                }
            }
            if merged.text.contains(CLOSE_TAG) {
                explode_line(merged, &mut out);
                index = last + 1;
                continue;
            }
            tracing::trace!(line = index, "unterminated checklist tag kept as text");
        }
        out.push(block.clone());
        index += 1;
    }
    out
}

fn explode_line(line: Block, out: &mut Vec<Block>) {
    let mut rest = line;
    loop {
        let Some((ids, open_end, close_start)) = next_item(&rest.text) else {
            break;
        };
        let close_end = close_start + CLOSE_TAG.len();
        let mut item = rest.slice(open_end, close_start);
        item.kind = BlockKind::ChecklistItem(ids);
        item.depth = 0;
        out.push(item);
        rest = rest.slice(close_end, rest.len());
        if rest.is_empty() {
            return;
        }
    }
    rest.kind = BlockKind::Plain;
    out.push(rest);
}

/// Ids plus char offsets of the label for a tag pair opening `text`.
fn next_item(text: &str) -> Option<(ChecklistRef, usize, usize)> {
    let caps = OPEN_TAG_RE.captures(text)?;
    let open_end_byte = caps.get(0)?.end();
    let close_byte = open_end_byte + text[open_end_byte..].find(CLOSE_TAG)?;
    let ids = ChecklistRef::new(caps[1].trim(), caps[2].trim());
    Some((
        ids,
        char_offset(text, open_end_byte),
        char_offset(text, close_byte),
    ))
}

/// Checklist ids present in a run of blocks, used to mint ones that are not.
#[derive(Debug, Default)]
pub(crate) struct UsedIds {
    lists: HashSet<String>,
    items: HashSet<String>,
}

impl UsedIds {
    pub(crate) fn collect(blocks: &[Block]) -> Self {
        let mut used = Self::default();
        for checklist in blocks.iter().filter_map(|block| block.kind.checklist()) {
            used.lists.insert(checklist.list_api_name.clone());
            used.items.insert(checklist.item_api_name.clone());
        }
        used
    }

    pub(crate) fn fresh_list(&self) -> String {
        fresh_id("checklist", &self.lists)
    }

    pub(crate) fn fresh_item(&self) -> String {
        fresh_id("checklist-item", &self.items)
    }

    fn mint_list(&mut self) -> String {
        let id = self.fresh_list();
        self.lists.insert(id.clone());
        id
    }

    fn mint_item(&mut self) -> String {
        let id = self.fresh_item();
        self.items.insert(id.clone());
        id
    }
}

fn fresh_id(prefix: &str, used: &HashSet<String>) -> String {
    (1..)
        .map(|n| format!("{prefix}-{n}"))
        .find(|id| !used.contains(id))
        .unwrap_or_else(|| prefix.to_string())
}

/// Make checklist ids unique. Returns how many blocks changed.
///
/// A list id may only label one run of adjacent items; a later run reusing it
/// gets a fresh list id. Item ids must be unique across the document. Missing
/// ids are minted as well.
pub fn assign_checklist_ids(blocks: &mut [Block]) -> usize {
    let mut known = UsedIds::collect(blocks);
    let mut seen_lists = HashSet::new();
    let mut seen_items = HashSet::new();
    // (id as written, id assigned) for the run in progress
    let mut run: Option<(String, String)> = None;
    let mut changed = 0;

    for block in blocks.iter_mut() {
        let BlockKind::ChecklistItem(ids) = &mut block.kind else {
            run = None;
            continue;
        };

        let list = match &run {
            Some((written, assigned)) if *written == ids.list_api_name => assigned.clone(),
            _ => {
                let assigned = if ids.list_api_name.is_empty()
                    || seen_lists.contains(&ids.list_api_name)
                {
                    known.mint_list()
                } else {
                    ids.list_api_name.clone()
                };
                seen_lists.insert(assigned.clone());
                run = Some((ids.list_api_name.clone(), assigned.clone()));
                assigned
            }
        };
        let item = if ids.item_api_name.is_empty() || seen_items.contains(&ids.item_api_name) {
            known.mint_item()
        } else {
            ids.item_api_name.clone()
        };
        seen_items.insert(item.clone());

        if list != ids.list_api_name || item != ids.item_api_name {
            tracing::debug!(
                from_list = %ids.list_api_name,
                from_item = %ids.item_api_name,
                to_list = %list,
                to_item = %item,
                "reassigned checklist ids"
            );
            changed += 1;
            ids.list_api_name = list;
            ids.item_api_name = item;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checklist(list: &str, item: &str, text: &str) -> Block {
        let mut block = Block::plain(text);
        block.kind = BlockKind::ChecklistItem(ChecklistRef::new(list, item));
        block
    }

    #[test]
    fn wrap_moves_tag_to_own_line() {
        assert_eq!(
            wrap_for_parsing("Intro [clist:l1|i1]Buy[/clist]"),
            "Intro \n[clist:l1|i1]Buy[/clist]"
        );
    }

    #[test]
    fn wrap_keeps_adjacent_items_together() {
        let text = "[clist:l1|i1]A[/clist][clist:l1|i2]B[/clist]";
        assert_eq!(wrap_for_parsing(text), text);
    }

    #[test]
    fn wrap_leaves_line_initial_and_escaped_tags() {
        let text = "a\n[clist:l|i]x[/clist]\nb \\[clist:l|j]";
        assert_eq!(wrap_for_parsing(text), text);
    }

    #[test]
    fn extract_returns_items_in_order() {
        let text = "x [clist:l1|i1]Buy **milk**[/clist][clist:l1|i2]Eggs[/clist]\n[clist:l2|i3]Multi\nline[/clist]";
        let entries = extract_checklists(text);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].value, "Buy **milk**");
        assert_eq!(entries[1].item_api_name, "i2");
        assert_eq!(entries[2].list_api_name, "l2");
        assert_eq!(entries[2].value, "Multi\nline");
    }

    #[test]
    fn split_handles_adjacent_items_and_trailing_text() {
        let blocks = vec![Block::plain("[clist:l|a]One[/clist][clist:l|b]Two[/clist] tail")];
        let out = split_checklist_blocks(blocks);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].text, "One");
        assert_eq!(
            out[1].kind,
            BlockKind::ChecklistItem(ChecklistRef::new("l", "b"))
        );
        assert_eq!(out[2].text, " tail");
        assert_eq!(out[2].kind, BlockKind::Plain);
    }

    #[test]
    fn split_joins_lines_until_close() {
        let blocks = vec![
            Block::plain("[clist:l|a]first"),
            Block::plain("second[/clist]"),
            Block::plain("after"),
        ];
        let out = split_checklist_blocks(blocks);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "first second");
        assert_eq!(out[1].text, "after");
    }

    #[test]
    fn unterminated_tag_stays_text() {
        let blocks = vec![Block::plain("[clist:l|a]never closed"), Block::plain("")];
        let out = split_checklist_blocks(blocks.clone());
        assert_eq!(out, blocks);
    }

    #[test]
    fn reused_list_in_later_run_gets_fresh_id() {
        let mut blocks = vec![
            checklist("l1", "i1", "a"),
            checklist("l1", "i2", "b"),
            Block::plain("between"),
            checklist("l1", "i3", "c"),
            checklist("l1", "i3", "d"),
        ];
        assert_eq!(assign_checklist_ids(&mut blocks), 2);

        let ids: Vec<_> = blocks.iter().filter_map(|b| b.kind.checklist()).collect();
        assert_eq!(ids[0].list_api_name, "l1");
        assert_eq!(ids[1].list_api_name, "l1");
        assert_eq!(ids[2].list_api_name, "checklist-1");
        assert_eq!(ids[3].list_api_name, "checklist-1");
        assert_eq!(ids[2].item_api_name, "i3");
        assert_eq!(ids[3].item_api_name, "checklist-item-1");

        assert_eq!(assign_checklist_ids(&mut blocks), 0);
    }
}
