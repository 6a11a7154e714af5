//! Block normalization.
//!
//! Pasted or imported content can hold blocks that break the document's
//! invariants: text with embedded newlines, atomic entities sitting inside a
//! line of text, or checklist ids that collide. [`normalize`] rewrites the block
//! list so that:
//!
//! - no block text contains `\n`
//! - every atomic entity lives alone in an `Atomic` block
//! - each checklist list id labels one run of items and item ids are unique
//! - no entity range points at a missing entity
//! - ranges stay inside their block's text and entity ranges never overlap
//!
//! Running it on its own output changes nothing.

use crate::checklist;
use crate::model::{Block, BlockKind, Document, Entity, MAX_DEPTH};

pub fn normalize(mut doc: Document) -> Document {
    let mut blocks = Vec::with_capacity(doc.blocks().len());
    for block in doc.blocks() {
        split_block(&doc, block, &mut blocks);
    }
    let reassigned = checklist::assign_checklist_ids(&mut blocks);
    tracing::trace!(
        before = doc.blocks().len(),
        after = blocks.len(),
        reassigned,
        "normalized blocks"
    );
    doc.replace_blocks(blocks);
    doc.remove_orphan_ranges();
    doc
}

fn split_block(doc: &Document, block: &Block, out: &mut Vec<Block>) {
    let mut block = block.clone();
    block.clip_ranges();
    if block.is_empty() {
        out.push(settle(block));
        return;
    }
    let block = &block;

    let chars: Vec<char> = block.text.chars().collect();
    let atomic_at = |index: usize| {
        block
            .entity_at(index)
            .filter(|range| doc.entity(range.key).is_some_and(Entity::is_atomic))
    };
    // An item holding only attachments would vanish into atomic blocks.
    let holds_kind = !matches!(block.kind, BlockKind::Plain | BlockKind::Atomic)
        && chars
            .iter()
            .enumerate()
            .all(|(index, c)| *c == '\n' || atomic_at(index).is_some());
    let mut splitter = Splitter {
        block,
        out,
        start: 0,
        after_atomic: false,
        keep_empty: holds_kind,
    };

    let mut index = 0;
    while index < chars.len() {
        if chars[index] == '\n' {
            splitter.piece(index, false);
            splitter.start = index + 1;
            splitter.after_atomic = false;
            index += 1;
            continue;
        }
        match atomic_at(index) {
            Some(range) => {
                splitter.piece(index, true);
                splitter.out.push(Block::atomic(range.key));
                index = range.end().max(index + 1);
                splitter.start = index;
                splitter.after_atomic = true;
            }
            None => index += 1,
        }
    }
    splitter.piece(chars.len(), false);
}

struct Splitter<'a> {
    block: &'a Block,
    out: &'a mut Vec<Block>,
    start: usize,
    after_atomic: bool,
    /// Emit one empty piece before the first atomic block, keeping the kind.
    keep_empty: bool,
}

impl Splitter<'_> {
    /// Emit `[start, end)` of the source block as its own block.
    ///
    /// Empty pieces touching an atomic char are dropped, except before an
    /// atomic block that would otherwise open the document.
    fn piece(&mut self, end: usize, before_atomic: bool) {
        if self.start == end && (self.after_atomic || before_atomic) {
            let opens_document = before_atomic && !self.after_atomic && self.out.is_empty();
            let keeps_kind = before_atomic && self.keep_empty;
            if !opens_document && !keeps_kind {
                return;
            }
        }
        self.keep_empty = false;
        self.out.push(settle(self.block.slice(self.start, end)));
    }
}

/// Kind and depth a text block may carry.
fn settle(mut block: Block) -> Block {
    if block.kind == BlockKind::Atomic {
        block.kind = BlockKind::Plain;
    }
    block.depth = if block.kind.is_list_item() {
        block.depth.min(MAX_DEPTH)
    } else {
        0
    };
    block
}
