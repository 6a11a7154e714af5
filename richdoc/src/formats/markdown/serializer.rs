//! Markdown serialization (Document → markdown text)
//!
//! Blocks become lines joined with `\n`. Inline styles are written with a
//! marker stack: when the style set changes between two runs of text, markers
//! are closed from the top of the stack down to the first style that ends, and
//! the missing ones are opened again. Whitespace at the edge of a styled run is
//! moved outside the markers, since `** bold**` is not emphasis in markdown.
//!
//! Entities are written back as the tokens the parser reads:
//!
//! | Entity            | Written as            |
//! |-------------------|-----------------------|
//! | Variable          | `{{apiName}}`         |
//! | Mention           | `[name|userId]`       |
//! | Link              | `[text](url)`         |
//! | Link (autolinked) | the bare text         |
//! | Image/Video/File  | `![name](url)`        |

use super::inline;
use crate::checklist::{self, CLOSE_TAG};
use crate::model::{Block, BlockKind, Document, Entity, EntityData, InlineStyle, VariableDef};

/// Knobs for [`serialize_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// When false, inline style markers are dropped and only the custom tokens
    /// are escaped, matching a parser running with markdown disabled.
    pub markdown_enabled: bool,
    /// Variables the output will be parsed with. Literal `{{name}}` text is
    /// written as is unless it names one of these or a variable the document
    /// already holds; then the braces are escaped so it reads back as text.
    pub variables: Vec<VariableDef>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            markdown_enabled: true,
            variables: Vec::new(),
        }
    }
}

impl SerializeOptions {
    /// Options for text that will be read with markdown syntax off.
    pub fn plain() -> Self {
        Self {
            markdown_enabled: false,
            ..Self::default()
        }
    }
}

pub fn serialize(doc: &Document) -> String {
    serialize_with(doc, &SerializeOptions::default())
}

pub fn serialize_with(doc: &Document, options: &SerializeOptions) -> String {
    let writer = BlockWriter {
        doc,
        markdown: options.markdown_enabled,
        known_variables: known_variables(doc, &options.variables),
    };
    let mut lines: Vec<String> = Vec::with_capacity(doc.blocks().len());
    let mut levels: Vec<ListLevel> = Vec::new();
    // Whether the last line is paragraph text inside a list item. A following
    // unindented line is then a lazy continuation and the list stays open.
    let mut in_item = false;
    // List id of the checklist run the last line belongs to.
    let mut open_run: Option<&str> = None;

    for block in doc.blocks() {
        let is_blank = block.kind == BlockKind::Plain && block.is_empty();
        let is_list_item = block.kind.is_list_item();
        if !in_item && !is_blank && !is_list_item {
            levels.clear();
        }
        in_item = if is_list_item {
            !block.is_empty()
        } else {
            in_item && !is_blank
        };

        if let BlockKind::ChecklistItem(ids) = &block.kind {
            let item = format!(
                "{}{}{}",
                checklist::open_tag(ids),
                writer.inline(block),
                CLOSE_TAG
            );
            match lines.last_mut() {
                Some(line) if open_run == Some(ids.list_api_name.as_str()) => line.push_str(&item),
                _ => lines.push(item),
            }
            open_run = Some(ids.list_api_name.as_str());
            continue;
        }
        open_run = None;

        let line = match &block.kind {
            BlockKind::OrderedListItem | BlockKind::UnorderedListItem => {
                let ordered = block.kind == BlockKind::OrderedListItem;
                let prefix = list_prefix(&mut levels, ordered, block.depth);
                prefix + &writer.inline(block)
            }
            BlockKind::Atomic => {
                match block
                    .entity_ranges
                    .first()
                    .and_then(|range| doc.entity(range.key))
                    .filter(|entity| entity.is_atomic())
                {
                    Some(entity) => attachment_token(entity, options.markdown_enabled),
                    None => writer.inline(block),
                }
            }
            _ => writer.inline(block),
        };
        lines.push(line);
    }

    lines.join("\n")
}

struct ListLevel {
    ordered: bool,
    counter: usize,
    content_column: usize,
}

/// Marker and indentation for a list item at `depth`.
///
/// Nested items are indented to the content column of their parent so the
/// markdown parser nests them under it. Depth cannot skip a level.
fn list_prefix(levels: &mut Vec<ListLevel>, ordered: bool, depth: u8) -> String {
    let depth = usize::from(depth).min(levels.len());
    levels.truncate(depth + 1);
    let indent = depth
        .checked_sub(1)
        .map_or(0, |parent| levels[parent].content_column);
    let counter = match levels.get(depth) {
        Some(level) if level.ordered == ordered => level.counter + 1,
        _ => 1,
    };
    let marker = if ordered {
        format!("{counter}. ")
    } else {
        "- ".to_string()
    };
    let level = ListLevel {
        ordered,
        counter,
        content_column: indent + marker.len(),
    };
    if levels.len() > depth {
        levels[depth] = level;
    } else {
        levels.push(level);
    }
    format!("{}{marker}", " ".repeat(indent))
}

fn marker(style: InlineStyle) -> &'static str {
    match style {
        InlineStyle::Bold => "**",
        InlineStyle::Italic => "*",
        InlineStyle::Strikethrough => "~~",
    }
}

/// Lowercased names of every variable a `{{name}}` token could resolve to.
fn known_variables(doc: &Document, variables: &[VariableDef]) -> Vec<String> {
    let in_document = doc.entities().values().filter_map(|entity| match &entity.data {
        EntityData::Variable { api_name, .. } => Some(api_name.as_str()),
        _ => None,
    });
    let mut names: Vec<String> = variables
        .iter()
        .map(|def| def.api_name.as_str())
        .chain(in_document)
        .map(str::to_ascii_lowercase)
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Marks the `{` chars that open a `{{name}}` token naming a known variable.
fn variable_braces(chars: &[char], known: &[String]) -> Vec<bool> {
    let mut braces = vec![false; chars.len()];
    if known.is_empty() {
        return braces;
    }
    for index in 0..chars.len().saturating_sub(1) {
        if chars[index] != '{' || chars[index + 1] != '{' {
            continue;
        }
        let rest: String = chars[index..].iter().collect();
        let resolves = inline::variable_token_name(&rest).is_some_and(|name| {
            known
                .binary_search(&name.to_ascii_lowercase())
                .is_ok()
        });
        if resolves {
            braces[index] = true;
            braces[index + 1] = true;
        }
    }
    braces
}

struct BlockWriter<'d> {
    doc: &'d Document,
    markdown: bool,
    known_variables: Vec<String>,
}

impl BlockWriter<'_> {
    fn inline(&self, block: &Block) -> String {
        write_inline(self.doc, block, self.markdown, &self.known_variables)
    }
}

fn write_inline(doc: &Document, block: &Block, markdown: bool, known: &[String]) -> String {
    let chars: Vec<char> = block.text.chars().collect();
    let masks = if markdown {
        block.style_masks()
    } else {
        vec![0; chars.len()]
    };
    let braces = variable_braces(&chars, known);
    let mut writer = InlineWriter {
        out: String::with_capacity(block.text.len()),
        stack: Vec::new(),
        floor: 0,
        chars: &chars,
        masks: &masks,
        braces: &braces,
        markdown,
    };

    let mut index = 0;
    while index < chars.len() {
        if let Some(range) = block.entity_at(index) {
            let end = range.end().min(chars.len());
            match doc.entity(range.key) {
                Some(entity) => writer.entity(entity, index, end),
                None => writer.text(index, end),
            }
            index = end;
            continue;
        }
        let mask = masks[index];
        let mut end = index + 1;
        while end < chars.len() && masks[end] == mask && block.entity_at(end).is_none() {
            end += 1;
        }
        writer.text(index, end);
        index = end;
    }
    writer.close_down_to(0);
    writer.out
}

struct InlineWriter<'a> {
    out: String,
    stack: Vec<InlineStyle>,
    /// Markers below this stack height belong outside the current link.
    floor: usize,
    chars: &'a [char],
    masks: &'a [u8],
    /// `{` chars that must be escaped to stay text.
    braces: &'a [bool],
    markdown: bool,
}

impl InlineWriter<'_> {
    fn text(&mut self, start: usize, end: usize) {
        let lead = self.chars[start..end]
            .iter()
            .take_while(|c| c.is_whitespace())
            .count();
        if start + lead == end {
            // Markers cannot open before whitespace, only close.
            self.close_missing(self.masks[start]);
            for index in start..end {
                self.push_escaped(index);
            }
            return;
        }
        for index in start..start + lead {
            self.push_escaped(index);
        }
        self.transition(self.masks[start]);
        for index in start + lead..end {
            self.push_escaped(index);
        }
    }

    fn entity(&mut self, entity: &Entity, start: usize, end: usize) {
        match &entity.data {
            EntityData::Variable { api_name, .. } => {
                self.transition(self.masks[start]);
                self.out.push_str(&format!("{{{{{api_name}}}}}"));
            }
            EntityData::Mention { user_id, name } => {
                self.transition(self.masks[start]);
                let name = escape_str(name, self.markdown);
                self.out.push_str(&format!("[{name}|{user_id}]"));
            }
            EntityData::Attachment(_) if entity.is_atomic() => {
                self.out.push_str(&attachment_token(entity, self.markdown));
            }
            EntityData::Link {
                autolink: true, ..
            } => {
                self.transition(self.masks[start]);
                self.out.extend(&self.chars[start..end]);
            }
            EntityData::Link { url, .. } => self.link(url, start, end),
            EntityData::Attachment(token) => self.link(&token.url, start, end),
        }
    }

    fn link(&mut self, url: &str, start: usize, end: usize) {
        let common = self.masks[start..end]
            .iter()
            .fold(u8::MAX, |acc, mask| acc & mask);
        self.close_missing(common);
        self.out.push('[');
        let outer_floor = self.floor;
        self.floor = self.stack.len();

        let mut index = start;
        while index < end {
            let mask = self.masks[index];
            let mut run_end = index + 1;
            while run_end < end && self.masks[run_end] == mask {
                run_end += 1;
            }
            self.text(index, run_end);
            index = run_end;
        }

        self.close_down_to(self.floor);
        self.floor = outer_floor;
        self.out.push_str("](");
        self.out.push_str(&link_destination(url, self.markdown));
        self.out.push(')');
    }

    /// Close styles missing from `mask`, then open the ones not yet open.
    fn transition(&mut self, mask: u8) {
        self.close_missing(mask);
        for style in InlineStyle::ALL {
            if mask & style.bit() != 0 && !self.stack.contains(&style) {
                self.out.push_str(marker(style));
                self.stack.push(style);
            }
        }
    }

    fn close_missing(&mut self, mask: u8) {
        let first_missing = self
            .stack
            .iter()
            .skip(self.floor)
            .position(|style| mask & style.bit() == 0);
        if let Some(position) = first_missing {
            self.close_down_to(self.floor + position);
        }
    }

    fn close_down_to(&mut self, height: usize) {
        while self.stack.len() > height {
            let Some(style) = self.stack.pop() else {
                break;
            };
            let kept = self.out.trim_end().len();
            let trailing = self.out.split_off(kept);
            self.out.push_str(marker(style));
            self.out.push_str(&trailing);
        }
    }

    fn push_escaped(&mut self, index: usize) {
        if self.braces[index] {
            self.out.push_str("\\{");
            return;
        }
        match escape_at(self.chars, index, self.markdown) {
            Some(escaped) => self.out.push_str(&escaped),
            None => self.out.push(self.chars[index]),
        }
    }
}

fn attachment_token(entity: &Entity, markdown: bool) -> String {
    let (url, name) = match &entity.data {
        EntityData::Attachment(token) => (token.url.as_str(), token.name.as_deref()),
        EntityData::Link { url, name, .. } => (url.as_str(), name.as_deref()),
        _ => ("", None),
    };
    format!(
        "![{}]({})",
        escape_str(name.unwrap_or_default(), markdown),
        link_destination(url, markdown)
    )
}

fn link_destination(url: &str, markdown: bool) -> String {
    let needs_care = url.chars().any(|c| c.is_whitespace() || c == '(' || c == ')');
    if !needs_care {
        return url.to_string();
    }
    if markdown {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    } else {
        url.replace(' ', "%20")
            .replace('(', "%28")
            .replace(')', "%29")
    }
}

fn escape_str(text: &str, markdown: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for index in 0..chars.len() {
        // Mention names and alt text never start a line.
        if markdown && index == 0 && is_line_start_marker(&chars, 0) {
            out.push(chars[0]);
            continue;
        }
        match escape_at(&chars, index, markdown) {
            Some(escaped) => out.push_str(&escaped),
            None => out.push(chars[index]),
        }
    }
    out
}

fn is_line_start_marker(chars: &[char], index: usize) -> bool {
    index == 0 && matches!(chars.first(), Some('#' | '>' | '-' | '+' | '='))
}

/// Escaped form of `chars[index]`, if it needs one.
///
/// Offsets are block-relative, so index 0 is the first character after any list
/// marker or checklist tag.
fn escape_at(chars: &[char], index: usize, markdown: bool) -> Option<String> {
    let c = chars[index];
    if matches!(c, '\\' | '[' | ']') {
        return Some(format!("\\{c}"));
    }
    if !markdown {
        return None;
    }
    match c {
        '*' | '_' | '`' | '~' | '<' | '&' => Some(format!("\\{c}")),
        ' ' | '\t' if chars[..index].iter().all(|p| *p == ' ' || *p == '\t') => {
            let reference = if c == ' ' { "&#32;" } else { "&#9;" };
            Some(reference.to_string())
        }
        _ if is_line_start_marker(chars, index) => Some(format!("\\{c}")),
        '.' | ')' if (1..=9).contains(&index) && chars[..index].iter().all(char::is_ascii_digit) => {
            Some(format!("\\{c}"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChecklistRef, EntityKey};

    fn doc_of(blocks: Vec<Block>) -> Document {
        Document::from_parts(blocks, Default::default())
    }

    fn styled(text: &str, ranges: &[(usize, usize, InlineStyle)]) -> Block {
        let mut block = Block::plain(text);
        for (offset, length, style) in ranges {
            block.add_style(*offset, *length, *style);
        }
        block
    }

    #[test]
    fn whitespace_moves_outside_markers() {
        let block = styled("a bold b", &[(1, 6, InlineStyle::Bold)]);
        assert_eq!(serialize(&doc_of(vec![block])), "a **bold** b");
    }

    #[test]
    fn overlapping_styles_nest() {
        let block = styled(
            "abcd",
            &[(0, 3, InlineStyle::Bold), (2, 2, InlineStyle::Italic)],
        );
        assert_eq!(serialize(&doc_of(vec![block])), "**ab*c****d*");
    }

    #[test]
    fn list_markers_follow_depth_and_numbering() {
        let mut blocks = Vec::new();
        for (kind, depth, text) in [
            (BlockKind::OrderedListItem, 0, "one"),
            (BlockKind::UnorderedListItem, 1, "inner"),
            (BlockKind::OrderedListItem, 0, "two"),
            (BlockKind::Plain, 0, "break"),
            (BlockKind::OrderedListItem, 0, "again"),
        ] {
            let mut block = Block::new(kind, depth);
            block.text = text.to_string();
            blocks.push(block);
        }
        assert_eq!(
            serialize(&doc_of(blocks)),
            "1. one\n   - inner\n2. two\nbreak\n1. again"
        );
    }

    #[test]
    fn checklist_runs_share_a_line() {
        let item = |list: &str, id: &str, text: &str| {
            let mut block = Block::plain(text);
            block.kind = BlockKind::ChecklistItem(ChecklistRef::new(list, id));
            block
        };
        let doc = doc_of(vec![
            item("l1", "a", "A"),
            item("l1", "b", "B"),
            item("l2", "c", "C"),
            Block::plain("end"),
        ]);
        assert_eq!(
            serialize(&doc),
            "[clist:l1|a]A[/clist][clist:l1|b]B[/clist]\n[clist:l2|c]C[/clist]\nend"
        );
    }

    #[test]
    fn escapes_token_and_block_syntax() {
        let doc = doc_of(vec![
            Block::plain("{{x}} [a|1] *b*"),
            Block::plain("# not a heading"),
            Block::plain("1. not a list"),
            Block::plain("  indented"),
        ]);
        assert_eq!(
            serialize(&doc),
            "{{x}} \\[a|1\\] \\*b\\*\n\\# not a heading\n1\\. not a list\n&#32;&#32;indented"
        );
    }

    #[test]
    fn braces_escaped_only_for_known_variables() {
        let doc = doc_of(vec![Block::plain("{{ Due }} {{other}} {{{due}}}")]);
        let options = SerializeOptions {
            variables: vec![VariableDef::new("due", "Due date")],
            ..SerializeOptions::default()
        };
        assert_eq!(
            serialize_with(&doc, &options),
            "\\{\\{ Due }} {{other}} {\\{\\{due}}}"
        );
        assert_eq!(serialize(&doc), "{{ Due }} {{other}} {{{due}}}");
    }

    #[test]
    fn variables_in_the_document_count_as_known() {
        let mut doc = Document::new();
        let key = doc.create_entity(Entity::variable("due", "Due date", None));
        let mut block = Block::plain("");
        block.push_entity_text("Due date", &[], key);
        block.push_text(" {{due}}", &[]);
        doc.push_block(block);
        assert_eq!(serialize(&doc), "{{due}} \\{\\{due}}");
    }

    #[test]
    fn list_levels_survive_blank_lines() {
        let item = |kind: BlockKind, depth: u8, text: &str| {
            let mut block = Block::new(kind, depth);
            block.text = text.into();
            block
        };
        let doc = doc_of(vec![
            item(BlockKind::OrderedListItem, 0, "a"),
            Block::plain(""),
            item(BlockKind::OrderedListItem, 1, "b"),
            Block::plain("lazy"),
            item(BlockKind::UnorderedListItem, 2, "c"),
            Block::plain(""),
            Block::plain("out"),
            item(BlockKind::UnorderedListItem, 1, "d"),
        ]);
        assert_eq!(
            serialize(&doc),
            "1. a\n\n   1. b\nlazy\n      - c\n\nout\n- d"
        );
    }

    #[test]
    fn plain_mode_escapes_only_tokens() {
        let doc = doc_of(vec![styled("*a* [b]", &[(0, 3, InlineStyle::Bold)])]);
        assert_eq!(
            serialize_with(&doc, &SerializeOptions::plain()),
            "*a* \\[b\\]"
        );
    }

    #[test]
    fn dangling_entity_renders_as_text() {
        let mut block = Block::plain("Ann");
        block.add_entity(0, 3, EntityKey(9));
        assert_eq!(serialize(&doc_of(vec![block])), "Ann");
    }
}
