//! Shared helpers for the integration tests

use richdoc::model::{BlockView, Document, VariableDef};
use richdoc::{normalize, parse, serialize};
use std::path::PathBuf;

pub fn variables() -> Vec<VariableDef> {
    vec![
        VariableDef::new("field-1", "Name"),
        VariableDef::new("due", "Due date"),
    ]
}

pub fn md(source: &str) -> Document {
    parse(source, &variables(), true)
}

/// Serialize a normalized document and parse it again.
pub fn reparse(doc: &Document) -> Document {
    md(&serialize(doc))
}

/// Assert `parse(serialize(normalize(d)))` matches `normalize(d)`.
pub fn assert_stable(source: &str) {
    let normalized = normalize(md(source));
    let again = reparse(&normalized);
    let expected: Vec<BlockView> = normalized.structural_view();
    assert_eq!(
        again.structural_view(),
        expected,
        "round trip changed the document\nsource: {source:?}\nserialized: {:?}",
        serialize(&normalized)
    );
}

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {path:?}: {e}"))
}
