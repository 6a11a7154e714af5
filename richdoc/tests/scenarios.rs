//! Concrete end-to-end scenarios

use crate::common::{md, reparse};
use richdoc::model::{
    AttachmentToken, Block, BlockKind, Document, Entity, EntityData, EntityKind, InlineStyle,
    StyleRange, VariableDef, ATOMIC_PLACEHOLDER,
};
use richdoc::{
    extract_checklists, from_plain_text, is_pasted_content_with_variables, normalize, parse,
    serialize, ChecklistEntry,
};

#[test]
fn variable_and_bold_in_one_block() {
    let variables = [VariableDef::new("field-1", "Name")];
    let doc = parse("**Bold** {{field-1}}", &variables, true);

    assert_eq!(doc.blocks().len(), 1);
    let block = &doc.blocks()[0];
    assert_eq!(block.text, "Bold Name");
    assert_eq!(
        block.style_ranges,
        vec![StyleRange {
            offset: 0,
            length: 4,
            style: InlineStyle::Bold
        }]
    );
    let range = &block.entity_ranges[0];
    assert_eq!((range.offset, range.length), (5, 4));
    let entity = doc.entity(range.key).unwrap();
    assert_eq!(entity.kind, EntityKind::Variable);
    assert!(matches!(&entity.data, EntityData::Variable { title, .. } if title == "Name"));
}

#[test]
fn image_alone_is_an_atomic_block() {
    let doc = parse("![pic.png](http://x/pic.png)", &[], true);

    assert_eq!(doc.blocks().len(), 1);
    let block = &doc.blocks()[0];
    assert_eq!(block.kind, BlockKind::Atomic);
    assert_eq!(block.len(), 1);
    let entity = doc.entity(block.entity_ranges[0].key).unwrap();
    assert_eq!(entity.kind, EntityKind::Image);
    assert_eq!(entity.url(), Some("http://x/pic.png"));
}

#[test]
fn checklist_round_trip() {
    let doc = parse("[clist:l1|i1]Buy milk[/clist]", &[], true);

    assert_eq!(doc.blocks().len(), 1);
    let block = &doc.blocks()[0];
    assert_eq!(block.text, "Buy milk");
    let ids = block.kind.checklist().unwrap();
    assert_eq!(ids.list_api_name, "l1");
    assert_eq!(ids.item_api_name, "i1");

    assert_eq!(
        extract_checklists(&serialize(&doc)),
        vec![ChecklistEntry {
            list_api_name: "l1".into(),
            item_api_name: "i1".into(),
            value: "Buy milk".into(),
        }]
    );
}

#[test]
fn mixed_line_normalizes_into_three_blocks() {
    let mut doc = Document::new();
    let key = doc.create_entity(Entity::attachment(
        EntityKind::Image,
        AttachmentToken {
            url: "http://x/pic.png".into(),
            id: None,
            name: Some("pic.png".into()),
        },
    ));
    let mut block = Block::plain("A");
    block.push_entity_text(&ATOMIC_PLACEHOLDER.to_string(), &[], key);
    block.push_text("B", &[]);
    doc.push_block(block);

    let doc = normalize(doc);
    let shape: Vec<_> = doc
        .blocks()
        .iter()
        .map(|b| (b.kind.clone(), b.text.clone()))
        .collect();
    assert_eq!(
        shape,
        vec![
            (BlockKind::Plain, "A".to_string()),
            (BlockKind::Atomic, ATOMIC_PLACEHOLDER.to_string()),
            (BlockKind::Plain, "B".to_string()),
        ]
    );
    assert_eq!(doc.entity_at(1, 0).unwrap().kind, EntityKind::Image);
}

#[test]
fn parsed_inline_image_normalizes_the_same_way() {
    let doc = normalize(md("A![pic.png](http://x/pic.png)B"));
    let kinds: Vec<_> = doc.blocks().iter().map(|b| b.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![BlockKind::Plain, BlockKind::Atomic, BlockKind::Plain]
    );
}

#[test]
fn clipboard_detection() {
    assert!(is_pasted_content_with_variables("Hello {{x}}"));
    assert!(!is_pasted_content_with_variables("Hello"));
    assert_eq!(from_plain_text("Hello", &[], true), None);
}

#[test]
fn unresolved_variable_stays_literal() {
    let doc = parse("{{unknown-field}}", &[], true);
    assert_eq!(doc.blocks()[0].text, "{{unknown-field}}");
    assert!(doc.entities().is_empty());

    assert_eq!(serialize(&doc), "{{unknown-field}}");
    let again = reparse(&doc);
    assert_eq!(again.blocks()[0].text, "{{unknown-field}}");
    assert!(again.entities().is_empty());
}
