//! In-memory document model.
//!
//! A [`Document`] is an ordered list of [`Block`]s plus a side map of
//! [`Entity`]s. Blocks never hold entity data directly, only
//! `(offset, length, key)` ranges into that map, so replacing a range never
//! copies the annotation it points at.

mod block;
mod collab;
mod document;
mod entity;

pub use block::{
    Block, BlockKind, ChecklistRef, EntityRange, InlineStyle, StyleRange, ATOMIC_PLACEHOLDER,
    MAX_DEPTH,
};
pub use collab::{suggest_mentions, Attachment, MentionUser, VariableDef};
pub use document::{BlockView, Document};
pub use entity::{
    attachment_kind_for_url, AttachmentToken, Entity, EntityData, EntityKey, EntityKind,
    Mutability,
};
