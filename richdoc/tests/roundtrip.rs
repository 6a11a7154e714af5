//! Serialize → parse stability

use crate::common::{assert_stable, fixture, md};
use insta::assert_snapshot;
use richdoc::model::{Block, BlockKind, Document, Entity, InlineStyle};
use richdoc::{extract_checklists, normalize, serialize};

#[test]
fn kitchensink_serializes_back_to_its_source() {
    let source = fixture("kitchensink.md");
    let doc = normalize(md(&source));
    assert_eq!(serialize(&doc), source);
}

#[test]
fn kitchensink_is_stable() {
    assert_stable(&fixture("kitchensink.md"));
}

#[test]
fn blank_lines_survive() {
    assert_stable("a\n\n\nb");
    assert_stable("\n\na\n\n");
}

#[test]
fn styles_survive() {
    assert_stable("**a** b *c* ~~d~~");
    assert_stable("***both*** and __under__ _score_");
}

#[test]
fn lists_survive() {
    assert_stable("- a\n  - b\n1. c");
    assert_stable("x\n- y\nz");
    assert_stable("1) paren\n2) list");
    assert_stable("- a\n\n- b");
    assert_stable("- a\n\n  - b");
    assert_stable("1. a\n\n   1. b");
    assert_stable("- a\nlazy\n  - b\n\nout\n  - c");
    assert_stable("- ```\n  code\n  ```");
}

#[test]
fn checklist_lines_merge_into_one_run() {
    assert_stable("[clist:l|a]A[/clist]\n[clist:l|b]B[/clist]");
    assert_stable("before [clist:l|a]A[/clist] after");
    assert_stable("[clist:l|a]A[/clist]\n\n[clist:l|b]B[/clist]");
}

#[test]
fn checklist_item_holding_an_attachment_survives() {
    let source = "[clist:l|a]![i.png](http://x/i.png)[/clist]";
    assert_stable(source);

    let text = serialize(&normalize(md(source)));
    assert_eq!(text, "[clist:l|a][/clist]\n![i.png](http://x/i.png)");
    assert_eq!(extract_checklists(&text).len(), 1);
}

#[test]
fn atomic_blocks_survive() {
    assert_stable("![a.png](https://x.io/a.png)");
    assert_stable("text\n![clip.mp4](https://x.io/clip.mp4)\nmore");
}

#[test]
fn block_syntax_in_text_is_escaped() {
    assert_stable("# heading line");
    assert_stable("> quote");
    assert_stable("<b>html</b>");
    assert_stable("text with \\* and \\_ and \\`");
    assert_stable("\\[clist:l|a]x[/clist]");
}

#[test]
fn links_survive() {
    assert_stable("mail a@b.co or www.example.com or https://x.io/p");
    assert_stable("[x](javascript:alert(1))");
    assert_stable("Dear {{due}}, see [Ann|7] and [docs](https://x.io/d)");
}

#[test]
fn styled_link_text() {
    let mut doc = Document::new();
    let key = doc.create_entity(Entity::link("https://x.io"));
    let mut block = Block::plain("see ");
    block.push_text("bold ", &[InlineStyle::Bold]);
    block.push_entity_text("link", &[InlineStyle::Bold, InlineStyle::Italic], key);
    block.push_text(" end", &[]);
    doc.push_block(block);

    assert_snapshot!(serialize(&doc), @"see **bold [*link*](https://x.io)** end");
    assert_stable(&serialize(&doc));
}

#[test]
fn nested_list_snapshot() {
    let mut doc = Document::new();
    for (kind, depth, text) in [
        (BlockKind::OrderedListItem, 0, "one"),
        (BlockKind::OrderedListItem, 1, "one.a"),
        (BlockKind::OrderedListItem, 1, "one.b"),
        (BlockKind::UnorderedListItem, 2, "deep"),
        (BlockKind::OrderedListItem, 0, "two"),
    ] {
        let mut block = Block::new(kind, depth);
        block.text = text.to_string();
        doc.push_block(block);
    }
    assert_snapshot!(serialize(&doc), @r"
    1. one
       1. one.a
       2. one.b
          - deep
    2. two
    ");
    assert_stable(&serialize(&doc));
}
