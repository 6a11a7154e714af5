//! Markdown parsing (markdown text → Document)
//!
//! Pipeline: checklist line wrapping → escape protection → lines (comrak AST
//! walk, or a plain line split when markdown is off) → checklist block grammar
//! → atomic promotion → escape restoration.
//!
//! Every input produces a document. Spans the grammar cannot make sense of are
//! kept as literal text.

use super::inline::{self, MARKDOWN_MATCHERS, PLAIN_MATCHERS};
use crate::checklist;
use crate::model::{
    Block, BlockKind, Document, Entity, InlineStyle, VariableDef, ATOMIC_PLACEHOLDER,
    MAX_DEPTH,
};
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, ComrakOptions};

/// Parse `text` into a document, resolving `{{ variable }}` tokens against `variables`.
///
/// With `markdown_enabled` false only the custom tokens (variables, mentions,
/// links, images, checklists) are recognized; everything else is plain text.
pub fn parse(text: &str, variables: &[VariableDef], markdown_enabled: bool) -> Document {
    let wrapped = checklist::wrap_for_parsing(text);
    let source = inline::protect(&wrapped);

    let mut doc = Document::new();
    let lines = if markdown_enabled {
        markdown_lines(&source, variables, &mut doc)
    } else {
        plain_lines(&source, variables, &mut doc)
    };

    let mut blocks = promote_atomic_lines(checklist::split_checklist_blocks(lines), &doc);
    if blocks.is_empty() {
        blocks.push(Block::plain(""));
    }
    tracing::debug!(
        blocks = blocks.len(),
        entities = doc.entities().len(),
        markdown_enabled,
        "parsed document"
    );

    doc.replace_blocks(blocks);
    doc.map_chars(inline::restore);
    doc.prune_entities();
    doc
}

fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options
}

fn plain_lines(source: &str, variables: &[VariableDef], doc: &mut Document) -> Vec<Block> {
    source
        .split('\n')
        .map(|line| plain_line(line, variables, doc))
        .collect()
}

fn plain_line(line: &str, variables: &[VariableDef], doc: &mut Document) -> Block {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let mut block = Block::plain("");
    inline::scan_into(doc, &mut block, line, &[], variables, PLAIN_MATCHERS);
    block
}

/// A line holding nothing but one attachment becomes an atomic block.
///
/// List and checklist items keep their kind (and checklist ids) as an empty
/// item followed by the atomic block.
fn promote_atomic_lines(blocks: Vec<Block>, doc: &Document) -> Vec<Block> {
    let mut out = Vec::with_capacity(blocks.len());
    for block in blocks {
        let atomic_key = match block.entity_ranges.as_slice() {
            [range]
                if range.offset == 0
                    && range.length == 1
                    && block.text.chars().eq([ATOMIC_PLACEHOLDER])
                    && doc.entity(range.key).is_some_and(|entity| entity.is_atomic()) =>
            {
                Some(range.key)
            }
            _ => None,
        };
        let Some(key) = atomic_key else {
            out.push(block);
            continue;
        };
        if block.kind != BlockKind::Plain {
            out.push(Block::new(block.kind, block.depth));
        }
        out.push(Block::atomic(key));
    }
    out
}

fn markdown_lines(source: &str, variables: &[VariableDef], doc: &mut Document) -> Vec<Block> {
    let arena = Arena::new();
    let options = default_comrak_options();
    let root = parse_document(&arena, source, &options);

    let mut collector = LineCollector {
        doc,
        variables,
        source_lines: source.lines().collect(),
        blocks: Vec::new(),
        current: None,
        last_line: 0,
        line: 0,
        styles: Vec::new(),
        pending: String::new(),
        pending_styles: Vec::new(),
        in_link: false,
    };
    collector.walk_block(root, BlockKind::Plain, 0);
    collector.finish();
    // Trailing blank lines count too, as they do when splitting plain text.
    collector.pad_blank_lines(source.split('\n').count());
    collector.blocks
}

/// Walks the comrak AST and cuts it into one block per source line.
///
/// `last_line` is the last source line already accounted for; whenever a block
/// starts further down, the blank lines in between become empty blocks.
struct LineCollector<'d, 's> {
    doc: &'d mut Document,
    variables: &'s [VariableDef],
    source_lines: Vec<&'s str>,
    blocks: Vec<Block>,
    current: Option<Block>,
    last_line: usize,
    line: usize,
    styles: Vec<InlineStyle>,
    pending: String,
    pending_styles: Vec<InlineStyle>,
    in_link: bool,
}

fn line_span<'a>(node: &'a AstNode<'a>) -> (usize, usize) {
    let sourcepos = node.data.borrow().sourcepos;
    let start = sourcepos.start.line;
    (start, sourcepos.end.line.max(start))
}

impl<'a> LineCollector<'_, '_> {
    fn walk_block(&mut self, node: &'a AstNode<'a>, kind: BlockKind, depth: u8) {
        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Document => {
                for child in node.children() {
                    self.walk_block(child, BlockKind::Plain, 0);
                }
            }
            NodeValue::Paragraph => self.paragraph(node, kind, depth),
            NodeValue::List(list) => {
                let ordered = matches!(list.list_type, ListType::Ordered);
                for item in node.children() {
                    self.list_item(item, ordered, depth);
                }
            }
            NodeValue::Item(_) => self.list_item(node, false, depth),
            _ => self.raw_lines(node),
        }
    }

    fn list_item(&mut self, item: &'a AstNode<'a>, ordered: bool, depth: u8) {
        let kind = if ordered {
            BlockKind::OrderedListItem
        } else {
            BlockKind::UnorderedListItem
        };
        let depth = depth.min(MAX_DEPTH);
        let (start, _) = line_span(item);

        let mut children = item.children().peekable();
        let opens_with_paragraph = children
            .peek()
            .is_some_and(|first| matches!(first.data.borrow().value, NodeValue::Paragraph));
        if opens_with_paragraph {
            if let Some(first) = children.next() {
                self.paragraph(first, kind, depth);
            }
        } else {
            // A fence or heading can open the item on its marker line. That
            // line stays one block: the item, holding the text after the marker.
            let opener = children.next_if(|first| {
                line_span(first).0 == start
                    && !matches!(first.data.borrow().value, NodeValue::List(_))
            });
            self.begin(kind, depth, start);
            if let Some(first) = opener {
                let column = first.data.borrow().sourcepos.start.column;
                let raw = start
                    .checked_sub(1)
                    .and_then(|index| self.source_lines.get(index).copied())
                    .and_then(|line| line.get(column.saturating_sub(1)..))
                    .unwrap_or_default();
                self.scan_raw(raw);
            }
            self.finish();
            if let Some(first) = opener {
                let (_, end) = line_span(first);
                self.raw_line_range(start + 1, end);
            }
        }

        for child in children {
            let value = child.data.borrow().value.clone();
            match value {
                NodeValue::Paragraph => self.paragraph(child, BlockKind::Plain, 0),
                NodeValue::List(list) => {
                    let nested_ordered = matches!(list.list_type, ListType::Ordered);
                    for nested in child.children() {
                        self.list_item(nested, nested_ordered, depth.saturating_add(1));
                    }
                }
                _ => self.raw_lines(child),
            }
        }
    }

    fn paragraph(&mut self, node: &'a AstNode<'a>, kind: BlockKind, depth: u8) {
        let (start, end) = line_span(node);
        self.begin(kind, depth, start);
        for child in node.children() {
            self.inline(child);
        }
        self.finish();
        self.last_line = self.last_line.max(end);
    }

    /// Constructs this dialect does not support are read back as the plain
    /// lines they were written as.
    fn raw_lines(&mut self, node: &'a AstNode<'a>) {
        let (start, end) = line_span(node);
        tracing::trace!(start, end, "unsupported markdown block kept as text");
        self.raw_line_range(start, end);
    }

    fn raw_line_range(&mut self, start: usize, end: usize) {
        if start == 0 {
            return;
        }
        for line in start..=end {
            let Some(raw) = self.source_lines.get(line - 1).copied() else {
                break;
            };
            self.begin(BlockKind::Plain, 0, line);
            self.scan_raw(raw);
            self.finish();
        }
        self.last_line = self.last_line.max(end);
    }

    /// Scan a raw source line into the current block, tokens only.
    fn scan_raw(&mut self, raw: &str) {
        let mut block = self.current.take().unwrap_or_default();
        inline::scan_into(
            self.doc,
            &mut block,
            raw.trim(),
            &[],
            self.variables,
            PLAIN_MATCHERS,
        );
        self.current = Some(block);
    }

    fn inline(&mut self, node: &'a AstNode<'a>) {
        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Text(text) => self.text(&text),
            NodeValue::Code(code) => self.text(&code.literal),
            NodeValue::HtmlInline(html) => self.text(&html),
            NodeValue::SoftBreak | NodeValue::LineBreak => self.line_break(),
            NodeValue::Strong => self.styled(node, InlineStyle::Bold),
            NodeValue::Emph => self.styled(node, InlineStyle::Italic),
            NodeValue::Strikethrough => self.styled(node, InlineStyle::Strikethrough),
            NodeValue::Link(link) => self.link(node, &link.url),
            NodeValue::Image(link) => self.image(node, &link.url),
            _ => {
                for child in node.children() {
                    self.inline(child);
                }
            }
        }
    }

    fn styled(&mut self, node: &'a AstNode<'a>, style: InlineStyle) {
        self.styles.push(style);
        for child in node.children() {
            self.inline(child);
        }
        self.styles.pop();
    }

    fn link(&mut self, node: &'a AstNode<'a>, url: &str) {
        if self.in_link {
            for child in node.children() {
                self.inline(child);
            }
            return;
        }
        self.flush();
        let start = self.current_block().len();
        self.in_link = true;
        for child in node.children() {
            self.inline(child);
        }
        self.flush();
        self.in_link = false;

        let block = self.current.get_or_insert_with(Block::default);
        let end = block.len();
        if end == start {
            return;
        }
        if !inline::is_safe_url(url) {
            tracing::debug!(url, "link with unsafe scheme kept as text");
            return;
        }
        let text = block.slice(start, end).text;
        let entity = if is_autolink_text(&text, url) {
            Entity::autolink(url)
        } else {
            Entity::link(url)
        };
        let key = self.doc.create_entity(entity);
        let block = self.current_block();
        if !block.add_entity(start, end - start, key) {
            self.doc.remove_entity(key);
        }
    }

    fn image(&mut self, node: &'a AstNode<'a>, url: &str) {
        let mut alt = String::new();
        collect_text(node, &mut alt);
        if !inline::is_safe_url(url) {
            tracing::debug!(url, "image with unsafe scheme kept as text");
            self.text(&alt);
            return;
        }
        self.flush();
        let entity = inline::attachment_entity(url, &alt);
        let key = self.doc.create_entity(entity);
        self.current_block()
            .push_entity_text(&ATOMIC_PLACEHOLDER.to_string(), &[], key);
    }

    fn line_break(&mut self) {
        if self.in_link {
            self.text(" ");
            return;
        }
        self.finish();
        self.line += 1;
        self.begin(BlockKind::Plain, 0, self.line);
    }

    fn text(&mut self, text: &str) {
        let mut styles = self.styles.clone();
        styles.sort();
        styles.dedup();
        if styles != self.pending_styles {
            self.flush();
            self.pending_styles = styles;
        }
        self.pending.push_str(text);
    }

    /// Hand buffered text to the block. Comrak splits text nodes at bracket and
    /// bang characters, so tokens are only matched once a whole run is buffered.
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        let styles = self.pending_styles.clone();
        let mut block = self.current.take().unwrap_or_default();
        if self.in_link {
            block.push_text(&pending, &styles);
        } else {
            inline::scan_into(
                self.doc,
                &mut block,
                &pending,
                &styles,
                self.variables,
                MARKDOWN_MATCHERS,
            );
        }
        self.current = Some(block);
    }

    fn current_block(&mut self) -> &mut Block {
        self.current.get_or_insert_with(Block::default)
    }

    fn begin(&mut self, kind: BlockKind, depth: u8, line: usize) {
        self.finish();
        self.pad_blank_lines(line.saturating_sub(1));
        self.current = Some(Block::new(kind, depth));
        self.line = line;
        self.last_line = self.last_line.max(line);
    }

    /// Emit an empty block for every unaccounted line up to `through`.
    fn pad_blank_lines(&mut self, through: usize) {
        while self.last_line < through {
            self.blocks.push(Block::plain(""));
            self.last_line += 1;
        }
    }

    fn finish(&mut self) {
        self.flush();
        if let Some(block) = self.current.take() {
            self.blocks.push(block);
        }
    }
}

/// Comrak marks bare URLs and emails as links whose text is the address itself.
fn is_autolink_text(text: &str, url: &str) -> bool {
    text == url || url == format!("mailto:{text}") || url == format!("http://{text}")
}

fn collect_text<'a>(node: &'a AstNode<'a>, output: &mut String) {
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Text(text) => output.push_str(text),
            NodeValue::Code(code) => output.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => output.push(' '),
            _ => collect_text(child, output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChecklistRef, EntityData, StyleRange};

    fn texts(doc: &Document) -> Vec<&str> {
        doc.blocks().iter().map(|b| b.text.as_str()).collect()
    }

    #[test]
    fn soft_breaks_split_blocks() {
        let doc = parse("one\ntwo", &[], true);
        assert_eq!(texts(&doc), vec!["one", "two"]);
    }

    #[test]
    fn blank_lines_become_empty_blocks() {
        let doc = parse("a\n\n\nb", &[], true);
        assert_eq!(texts(&doc), vec!["a", "", "", "b"]);
    }

    #[test]
    fn nested_lists_carry_depth() {
        let doc = parse("- a\n  - b\n    - c\n      - d\n\n1. e", &[], true);
        let shape: Vec<_> = doc
            .blocks()
            .iter()
            .map(|b| (b.kind.clone(), b.depth, b.text.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (BlockKind::UnorderedListItem, 0, "a"),
                (BlockKind::UnorderedListItem, 1, "b"),
                (BlockKind::UnorderedListItem, 2, "c"),
                (BlockKind::UnorderedListItem, 2, "d"),
                (BlockKind::Plain, 0, ""),
                (BlockKind::OrderedListItem, 0, "e"),
            ]
        );
    }

    #[test]
    fn headings_and_code_are_plain_lines() {
        let doc = parse("# Title\n\n```\ncode\n```", &[], true);
        assert_eq!(texts(&doc), vec!["# Title", "", "```", "code", "```"]);
        assert!(doc.blocks().iter().all(|b| b.kind == BlockKind::Plain));
    }

    #[test]
    fn styles_cover_emphasis() {
        let doc = parse("a **b *c*** ~~d~~", &[], true);
        let block = &doc.blocks()[0];
        assert_eq!(block.text, "a b c d");
        assert_eq!(
            block.style_ranges,
            vec![
                StyleRange {
                    offset: 2,
                    length: 3,
                    style: InlineStyle::Bold
                },
                StyleRange {
                    offset: 4,
                    length: 1,
                    style: InlineStyle::Italic
                },
                StyleRange {
                    offset: 6,
                    length: 1,
                    style: InlineStyle::Strikethrough
                },
            ]
        );
    }

    #[test]
    fn links_and_autolinks() {
        let doc = parse("[site](https://x.io) and https://y.io", &[], true);
        let block = &doc.blocks()[0];
        assert_eq!(block.text, "site and https://y.io");
        let data: Vec<_> = block
            .entity_ranges
            .iter()
            .map(|r| doc.entity(r.key).unwrap().data.clone())
            .collect();
        assert_eq!(
            data,
            vec![
                EntityData::Link {
                    url: "https://x.io".into(),
                    name: None,
                    autolink: false
                },
                EntityData::Link {
                    url: "https://y.io".into(),
                    name: None,
                    autolink: true
                },
            ]
        );
    }

    #[test]
    fn inline_image_stays_in_its_line() {
        let doc = parse("A![i](http://x/i.png)B", &[], true);
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(doc.blocks()[0].kind, BlockKind::Plain);
        assert_eq!(doc.blocks()[0].entity_ranges[0].offset, 1);
    }

    #[test]
    fn escaped_tokens_stay_literal() {
        let vars = [VariableDef::new("x", "X")];
        let doc = parse(r"\{\{x}} \[Ann|1\] \*", &vars, true);
        assert_eq!(doc.blocks()[0].text, "{{x}} [Ann|1] *");
        assert!(doc.entities().is_empty());
    }

    #[test]
    fn plain_mode_ignores_markdown() {
        let vars = [VariableDef::new("x", "X")];
        let doc = parse("**a** {{x}}\n- b", &vars, false);
        assert_eq!(texts(&doc), vec!["**a** X", "- b"]);
        assert!(doc.blocks()[0].style_ranges.is_empty());
        assert_eq!(doc.blocks()[1].kind, BlockKind::Plain);
    }

    #[test]
    fn trailing_blank_lines_are_kept() {
        let doc = parse("a\n\n", &[], true);
        assert_eq!(texts(&doc), vec!["a", "", ""]);
    }

    #[test]
    fn attachment_in_an_item_keeps_the_item() {
        let source = "[clist:l|a]![i](http://x/i.png)[/clist]\n- ![j](http://x/j.png)";
        let doc = parse(source, &[], true);
        let shape: Vec<_> = doc
            .blocks()
            .iter()
            .map(|b| (b.kind.clone(), b.text.as_str()))
            .collect();
        let placeholder = ATOMIC_PLACEHOLDER.to_string();
        assert_eq!(
            shape,
            vec![
                (BlockKind::ChecklistItem(ChecklistRef::new("l", "a")), ""),
                (BlockKind::Atomic, placeholder.as_str()),
                (BlockKind::UnorderedListItem, ""),
                (BlockKind::Atomic, placeholder.as_str()),
            ]
        );
    }

    #[test]
    fn item_opening_with_a_fence_is_one_block_per_line() {
        let doc = parse("- ```\n  code\n  ```\n- # title", &[], true);
        let shape: Vec<_> = doc
            .blocks()
            .iter()
            .map(|b| (b.kind.clone(), b.text.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (BlockKind::UnorderedListItem, "```"),
                (BlockKind::Plain, "code"),
                (BlockKind::Plain, "```"),
                (BlockKind::UnorderedListItem, "# title"),
            ]
        );
    }

    #[test]
    fn empty_input_has_one_block() {
        let doc = parse("", &[], true);
        assert_eq!(texts(&doc), vec![""]);
    }
}
