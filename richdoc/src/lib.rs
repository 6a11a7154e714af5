//! Rich-text documents and their markdown form
//!
//!     This crate holds the document model a rich-text editor works on, and the conversion
//!     between that model and markdown extended with the editor's own tokens (variables,
//!     mentions, checklists and attachments).
//!
//!     This is a pure lib: it powers richdoc-cli but is shell agnostic. No code here should
//!     print, read env vars or touch the filesystem.
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── model                   # Blocks, entities, the document
//!     ├── checklist.rs            # [clist:L|I]..[/clist] tags and id rules
//!     ├── normalize.rs            # Block normalization
//!     ├── clipboard.rs            # Paste handling
//!     ├── formats
//!     │   ├── markdown
//!     │   │   ├── inline.rs       # Custom token matchers
//!     │   │   ├── parser.rs       # Parser implementation
//!     │   │   ├── serializer.rs   # Serializer implementation
//!     │   │   └── mod.rs
//!     │   └── json
//!     └── lib.rs
//!
//! Testing
//!     tests
//!     ├── lib.rs
//!     └── <area>.rs
//!
//!     Rust does not discover tests in subdirectories by default, so each area is a module of
//!     tests/lib.rs.
//!
//! Core Algorithms
//!
//!     Parsing runs comrak over the source and walks its AST line by line: every source line
//!     becomes one block, list items keep their nesting depth, and text nodes are scanned for
//!     the custom tokens. Serialization is the reverse, with a marker stack for inline styles.
//!     The pair is stable: serializing a parsed document and parsing it again yields the same
//!     document.
//!
//!     Normalization enforces the block invariants after a paste or import: no newlines in
//!     block text, atomic entities alone in their block, unique checklist ids, no entity ranges
//!     pointing nowhere.
//!
//! Formats
//!
//!     Format specific capabilities are implemented with the Format trait (see ./format.rs).
//!     - markdown: markdown plus tokens
//!     - plain: tokens only, markdown syntax off
//!     - json: the model as serde writes it

pub mod checklist;
pub mod clipboard;
pub mod error;
pub mod format;
pub mod formats;
pub mod model;
pub mod normalize;
pub mod registry;

pub use checklist::{assign_checklist_ids, extract_checklists, wrap_for_parsing, ChecklistEntry};
pub use clipboard::{
    from_clipboard, from_plain_text, is_pasted_content_with_variables, ClipboardPayload,
};
pub use error::FormatError;
pub use format::{Format, ParseContext};
pub use formats::markdown::{parse, serialize, serialize_with, SerializeOptions};
pub use model::Document;
pub use normalize::normalize;
pub use registry::FormatRegistry;
