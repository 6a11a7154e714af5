//! The document: ordered blocks plus the entity map they point into.

use super::block::{Block, BlockKind, ChecklistRef, StyleRange};
use super::entity::{Entity, EntityKey};
use crate::checklist;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered blocks and the keyed entity map their ranges reference.
///
/// Entities are never edited in place. Replacing an annotation means creating a
/// new entity and pointing the block's range at it; the old entry becomes an
/// orphan that [`Document::remove_orphan_ranges`] and [`Document::prune_entities`]
/// clean up.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    blocks: Vec<Block>,
    #[serde(default)]
    entities: BTreeMap<EntityKey, Entity>,
    #[serde(default)]
    next_entity_key: u32,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(blocks: Vec<Block>, entities: BTreeMap<EntityKey, Entity>) -> Self {
        let next_entity_key = entities.keys().next_back().map_or(0, |key| key.0.saturating_add(1));
        Self {
            blocks,
            entities,
            next_entity_key,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn push_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub(crate) fn replace_blocks(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
    }

    pub fn entities(&self) -> &BTreeMap<EntityKey, Entity> {
        &self.entities
    }

    pub fn create_entity(&mut self, entity: Entity) -> EntityKey {
        // Deserialized documents can carry a stale counter.
        let floor = self.entities.keys().next_back().map_or(0, |key| key.0.saturating_add(1));
        let key = EntityKey(self.next_entity_key.max(floor));
        self.next_entity_key = key.0.saturating_add(1);
        self.entities.insert(key, entity);
        key
    }

    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(&key)
    }

    pub fn remove_entity(&mut self, key: EntityKey) -> Option<Entity> {
        self.entities.remove(&key)
    }

    /// Entity bound to the char at `offset` of block `index`.
    pub fn entity_at(&self, index: usize, offset: usize) -> Option<&Entity> {
        let range = self.blocks.get(index)?.entity_at(offset)?;
        self.entity(range.key)
    }

    /// Block texts joined with newlines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drop entity ranges whose key no longer resolves. Returns how many were removed.
    pub fn remove_orphan_ranges(&mut self) -> usize {
        let entities = &self.entities;
        let mut removed = 0;
        for block in &mut self.blocks {
            let before = block.entity_ranges.len();
            block
                .entity_ranges
                .retain(|range| entities.contains_key(&range.key));
            removed += before - block.entity_ranges.len();
        }
        if removed > 0 {
            tracing::debug!(removed, "removed orphan entity ranges");
        }
        removed
    }

    /// Drop entities no block references any more.
    pub fn prune_entities(&mut self) -> usize {
        let referenced: std::collections::HashSet<EntityKey> = self
            .blocks
            .iter()
            .flat_map(|block| block.entity_ranges.iter().map(|range| range.key))
            .collect();
        let before = self.entities.len();
        self.entities.retain(|key, _| referenced.contains(key));
        before - self.entities.len()
    }

    pub fn has_dangling_entities(&self) -> bool {
        self.blocks.iter().any(|block| {
            block
                .entity_ranges
                .iter()
                .any(|range| !self.entities.contains_key(&range.key))
        })
    }

    /// Change the kind of block `index`. Returns `false` when there is no such block.
    ///
    /// A block entering checklist kind keeps any ids it is given; missing ids are
    /// assigned here, joining the list of a checklist item directly above it.
    pub fn set_block_kind(&mut self, index: usize, kind: BlockKind) -> bool {
        if index >= self.blocks.len() {
            return false;
        }
        let kind = match kind {
            BlockKind::ChecklistItem(ids) => {
                BlockKind::ChecklistItem(self.complete_checklist_ids(index, ids))
            }
            BlockKind::Atomic => return false,
            other => other,
        };
        let block = &mut self.blocks[index];
        if !kind.is_list_item() {
            block.depth = 0;
        }
        block.kind = kind;
        true
    }

    fn complete_checklist_ids(&self, index: usize, ids: ChecklistRef) -> ChecklistRef {
        if let Some(existing) = self.blocks[index].kind.checklist() {
            if ids.list_api_name.is_empty() && ids.item_api_name.is_empty() {
                return existing.clone();
            }
        }
        let used = checklist::UsedIds::collect(&self.blocks);
        let list_api_name = if !ids.list_api_name.is_empty() {
            ids.list_api_name
        } else {
            index
                .checked_sub(1)
                .and_then(|previous| self.blocks[previous].kind.checklist())
                .map(|previous| previous.list_api_name.clone())
                .unwrap_or_else(|| used.fresh_list())
        };
        let item_api_name = if ids.item_api_name.is_empty() {
            used.fresh_item()
        } else {
            ids.item_api_name
        };
        ChecklistRef {
            list_api_name,
            item_api_name,
        }
    }

    /// A comparable rendering of the document that does not depend on entity keys.
    pub fn structural_view(&self) -> Vec<BlockView> {
        self.blocks
            .iter()
            .map(|block| BlockView {
                kind: block.kind.clone(),
                depth: block.depth,
                text: block.text.clone(),
                style_ranges: block.style_ranges.clone(),
                entities: block
                    .entity_ranges
                    .iter()
                    .map(|range| {
                        (
                            range.offset,
                            range.length,
                            self.entities.get(&range.key).cloned(),
                        )
                    })
                    .collect(),
            })
            .collect()
    }

    pub(crate) fn map_chars(&mut self, map: impl Fn(char) -> char + Copy) {
        for block in &mut self.blocks {
            block.map_chars(map);
        }
        for entity in self.entities.values_mut() {
            entity.map_chars(map);
        }
    }
}

/// One block of [`Document::structural_view`], with entity data inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockView {
    pub kind: BlockKind,
    pub depth: u8,
    pub text: String,
    pub style_ranges: Vec<StyleRange>,
    pub entities: Vec<(usize, usize, Option<Entity>)>,
}
