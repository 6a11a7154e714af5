//! Blocks: one paragraph, list item, checklist item or atomic unit of a document.

use super::entity::EntityKey;
use serde::{Deserialize, Serialize};

/// Deepest list nesting level a block can carry.
pub const MAX_DEPTH: u8 = 2;

/// The single character an atomic block holds. Its entity carries the payload.
pub const ATOMIC_PLACEHOLDER: char = '\u{FFFC}';

/// Identifiers tying a checklist item block to its list and item records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistRef {
    pub list_api_name: String,
    pub item_api_name: String,
}

impl ChecklistRef {
    pub fn new(list_api_name: impl Into<String>, item_api_name: impl Into<String>) -> Self {
        Self {
            list_api_name: list_api_name.into(),
            item_api_name: item_api_name.into(),
        }
    }
}

/// What kind of unit a block is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockKind {
    #[default]
    Plain,
    OrderedListItem,
    UnorderedListItem,
    ChecklistItem(ChecklistRef),
    Atomic,
}

impl BlockKind {
    pub fn is_list_item(&self) -> bool {
        matches!(self, BlockKind::OrderedListItem | BlockKind::UnorderedListItem)
    }

    pub fn checklist(&self) -> Option<&ChecklistRef> {
        match self {
            BlockKind::ChecklistItem(checklist) => Some(checklist),
            _ => None,
        }
    }
}

/// Inline text styles a style range can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InlineStyle {
    Bold,
    Italic,
    Strikethrough,
}

impl InlineStyle {
    pub const ALL: [InlineStyle; 3] = [
        InlineStyle::Bold,
        InlineStyle::Italic,
        InlineStyle::Strikethrough,
    ];

    pub(crate) fn bit(self) -> u8 {
        match self {
            InlineStyle::Bold => 0b001,
            InlineStyle::Italic => 0b010,
            InlineStyle::Strikethrough => 0b100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: InlineStyle,
}

impl StyleRange {
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRange {
    pub offset: usize,
    pub length: usize,
    pub key: EntityKey,
}

impl EntityRange {
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.offset && offset < self.end()
    }
}

/// A paragraph-like unit of text with its style and entity annotations.
///
/// Offsets in both range lists count `char`s of `text`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default)]
    pub kind: BlockKind,
    #[serde(default)]
    pub depth: u8,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub style_ranges: Vec<StyleRange>,
    #[serde(default)]
    pub entity_ranges: Vec<EntityRange>,
}

impl Block {
    pub fn new(kind: BlockKind, depth: u8) -> Self {
        Self {
            kind,
            depth: depth.min(MAX_DEPTH),
            ..Self::default()
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A block holding one atomic entity over the placeholder character.
    pub fn atomic(key: EntityKey) -> Self {
        Self {
            kind: BlockKind::Atomic,
            depth: 0,
            text: ATOMIC_PLACEHOLDER.to_string(),
            style_ranges: Vec::new(),
            entity_ranges: vec![EntityRange {
                offset: 0,
                length: 1,
                key,
            }],
        }
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Append unstyled-by-entity text carrying the given styles.
    pub fn push_text(&mut self, text: &str, styles: &[InlineStyle]) {
        if text.is_empty() {
            return;
        }
        let offset = self.len();
        let length = text.chars().count();
        self.text.push_str(text);
        for style in styles {
            self.add_style(offset, length, *style);
        }
    }

    /// Append text bound to an entity.
    pub fn push_entity_text(&mut self, text: &str, styles: &[InlineStyle], key: EntityKey) {
        let offset = self.len();
        self.push_text(text, styles);
        let length = self.len() - offset;
        self.add_entity(offset, length, key);
    }

    /// Add a style range, merging with touching or overlapping ranges of the same style.
    pub fn add_style(&mut self, offset: usize, length: usize, style: InlineStyle) {
        if length == 0 {
            return;
        }
        let mut start = offset;
        let mut end = offset.saturating_add(length);
        self.style_ranges.retain(|range| {
            if range.style == style && range.offset <= end && range.end() >= start {
                start = start.min(range.offset);
                end = end.max(range.end());
                false
            } else {
                true
            }
        });
        self.style_ranges.push(StyleRange {
            offset: start,
            length: end - start,
            style,
        });
        self.style_ranges
            .sort_by(|a, b| (a.offset, a.style).cmp(&(b.offset, b.style)));
    }

    /// Bind `[offset, offset + length)` to an entity.
    ///
    /// Ranges overlapping an existing entity range are ignored.
    pub fn add_entity(&mut self, offset: usize, length: usize, key: EntityKey) -> bool {
        if length == 0 {
            return false;
        }
        let end = offset.saturating_add(length);
        if self
            .entity_ranges
            .iter()
            .any(|range| range.offset < end && offset < range.end())
        {
            return false;
        }
        let position = self
            .entity_ranges
            .partition_point(|range| range.offset < offset);
        self.entity_ranges.insert(
            position,
            EntityRange {
                offset,
                length,
                key,
            },
        );
        true
    }

    pub fn entity_at(&self, offset: usize) -> Option<&EntityRange> {
        self.entity_ranges
            .iter()
            .find(|range| range.contains(offset))
    }

    pub fn styles_at(&self, offset: usize) -> Vec<InlineStyle> {
        let mut styles: Vec<InlineStyle> = self
            .style_ranges
            .iter()
            .filter(|range| offset >= range.offset && offset < range.end())
            .map(|range| range.style)
            .collect();
        styles.sort();
        styles.dedup();
        styles
    }

    /// Bitmask of styles per char, in text order.
    pub(crate) fn style_masks(&self) -> Vec<u8> {
        let mut masks = vec![0u8; self.len()];
        for range in &self.style_ranges {
            let end = range.end().min(masks.len());
            for mask in masks.iter_mut().take(end).skip(range.offset) {
                *mask |= range.style.bit();
            }
        }
        masks
    }

    /// Copy of `[start, end)` with ranges clipped and re-based to the new block.
    ///
    /// Entity ranges crossing either cut are dropped rather than clipped, since an
    /// entity's text is only meaningful whole.
    pub fn slice(&self, start: usize, end: usize) -> Block {
        let end = end.min(self.len());
        let start = start.min(end);
        let text: String = self.text.chars().skip(start).take(end - start).collect();

        let style_ranges = self
            .style_ranges
            .iter()
            .filter_map(|range| {
                let from = range.offset.max(start);
                let to = range.end().min(end);
                (from < to).then(|| StyleRange {
                    offset: from - start,
                    length: to - from,
                    style: range.style,
                })
            })
            .collect();

        let entity_ranges = self
            .entity_ranges
            .iter()
            .filter(|range| range.offset >= start && range.end() <= end)
            .map(|range| EntityRange {
                offset: range.offset - start,
                length: range.length,
                key: range.key,
            })
            .collect();

        Block {
            kind: self.kind.clone(),
            depth: self.depth,
            text,
            style_ranges,
            entity_ranges,
        }
    }

    /// Append another block's content, shifting its ranges past the current end.
    pub fn append(&mut self, other: &Block) {
        let shift = self.len();
        self.text.push_str(&other.text);
        for range in &other.style_ranges {
            self.add_style(range.offset.saturating_add(shift), range.length, range.style);
        }
        for range in &other.entity_ranges {
            self.add_entity(range.offset.saturating_add(shift), range.length, range.key);
        }
    }

    /// Clip style ranges to the text and drop entity ranges that reach past it
    /// or overlap one listed before them.
    ///
    /// Blocks built through [`Block::add_style`] and [`Block::add_entity`]
    /// already hold; this is for blocks deserialized from outside.
    pub(crate) fn clip_ranges(&mut self) {
        let len = self.len();
        for range in std::mem::take(&mut self.style_ranges) {
            let start = range.offset.min(len);
            self.add_style(start, range.end().min(len) - start, range.style);
        }
        for range in std::mem::take(&mut self.entity_ranges) {
            if range.end() <= len {
                self.add_entity(range.offset, range.length, range.key);
            }
        }
    }

    /// Rewrite every char of the text through `map`, one char for one char.
    pub(crate) fn map_chars(&mut self, map: impl Fn(char) -> char) {
        self.text = self.text.chars().map(map).collect();
    }
}
