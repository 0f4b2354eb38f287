//! Flat item arena with a derived parent → children index.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Deserializer};
use shared::{
    domain::{
        ConditionalStyle, Item, ItemId, ItemKind, ItemMetadata, Position, PropMap, Relationships,
        StyleMap, Visibility,
    },
    error::StoreError,
    protocol::{deserialize_items, serialize_items},
};
use tracing::{debug, warn};

pub const DEFAULT_GRID_SIZE: f64 = 8.0;

/// Top-level replacement of item fields. `None` leaves a field untouched;
/// `parent_id: Some(None)` detaches the item to the root level.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemPatch {
    #[serde(rename = "type")]
    pub kind: Option<ItemKind>,
    #[serde(deserialize_with = "present_or_null")]
    pub parent_id: Option<Option<ItemId>>,
    pub order: Option<i64>,
    pub position: Option<Position>,
    pub style: Option<StyleMap>,
    pub props: Option<PropMap>,
    pub metadata: Option<ItemMetadata>,
    pub visibility: Option<Visibility>,
    pub conditional_style: Option<ConditionalStyle>,
    pub conditional_props: Option<BTreeMap<String, String>>,
    pub relationships: Option<Relationships>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<ItemId>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ItemId>::deserialize(deserializer).map(Some)
}

impl ItemPatch {
    pub fn props(mut self, props: PropMap) -> Self {
        self.props = Some(props);
        self
    }

    pub fn parent(mut self, parent_id: Option<ItemId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    fn apply(self, item: &mut Item) {
        if let Some(kind) = self.kind {
            item.kind = kind;
        }
        if let Some(parent_id) = self.parent_id {
            item.parent_id = parent_id;
        }
        if let Some(order) = self.order {
            item.order = order;
        }
        if let Some(position) = self.position {
            item.position = Some(position);
        }
        if let Some(style) = self.style {
            item.style = Some(style);
        }
        if let Some(props) = self.props {
            item.props = props;
        }
        if let Some(metadata) = self.metadata {
            item.metadata = metadata;
        }
        if let Some(visibility) = self.visibility {
            item.visibility = visibility;
        }
        if let Some(conditional_style) = self.conditional_style {
            item.conditional_style = Some(conditional_style);
        }
        if let Some(conditional_props) = self.conditional_props {
            item.conditional_props = conditional_props;
        }
        if let Some(relationships) = self.relationships {
            item.relationships = relationships;
        }
    }
}

struct Node {
    item: Item,
    /// Insertion stamp, the tie-breaker between siblings with equal `order`.
    seq: u64,
}

pub struct ItemStore {
    nodes: HashMap<ItemId, Node>,
    insertion: Vec<ItemId>,
    parents: HashMap<ItemId, Option<ItemId>>,
    children: HashMap<Option<ItemId>, Vec<ItemId>>,
    next_seq: u64,
    revision: u64,
    grid_size: f64,
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemStore {
    pub fn new() -> Self {
        Self::with_grid_size(DEFAULT_GRID_SIZE)
    }

    pub fn with_grid_size(grid_size: f64) -> Self {
        Self {
            nodes: HashMap::new(),
            insertion: Vec::new(),
            parents: HashMap::new(),
            children: HashMap::new(),
            next_seq: 0,
            revision: 0,
            grid_size,
        }
    }

    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut store = Self::new();
        store.replace_all(items);
        store
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        Ok(Self::from_items(deserialize_items(raw)?))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serialize_items(&self.snapshot())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.nodes.get(id).map(|node| &node.item)
    }

    /// Items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.insertion
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|node| &node.item))
    }

    /// Deep copy of every item, in insertion order.
    pub fn snapshot(&self) -> Vec<Item> {
        self.items().cloned().collect()
    }

    /// Stores `item` and returns its id. An empty or already used id is
    /// replaced with a fresh one so ids stay unique.
    pub fn add_item(&mut self, mut item: Item) -> ItemId {
        if item.id.is_empty() || self.nodes.contains_key(&item.id) {
            let fresh = ItemId::random();
            if !item.id.is_empty() {
                warn!(item_id = %item.id, new_id = %fresh, "duplicate item id; assigning a fresh one");
            }
            item.id = fresh;
        }
        let id = item.id.clone();
        self.insert_node(item);
        self.reindex();
        self.revision += 1;
        debug!(item_id = %id, "item added");
        id
    }

    fn insert_node(&mut self, item: Item) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.insertion.push(item.id.clone());
        self.nodes.insert(item.id.clone(), Node { item, seq });
    }

    pub fn update_item(&mut self, id: &ItemId, patch: ItemPatch) -> Result<(), StoreError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.apply(&mut node.item);
        node.item.metadata.updated_at = Some(Utc::now());
        self.reindex();
        self.revision += 1;
        debug!(item_id = %id, "item updated");
        Ok(())
    }

    /// Moves a root item, snapping to the grid. Children are laid out by
    /// their container, so moving one leaves it unchanged.
    pub fn move_item(&mut self, id: &ItemId, position: Position) -> Result<(), StoreError> {
        let is_root = self.effective_parent(id).is_none();
        let grid_size = self.grid_size;
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if !is_root {
            debug!(item_id = %id, "ignoring move of a flow-positioned child");
            return Ok(());
        }
        node.item.position = Some(position.snapped(grid_size));
        self.revision += 1;
        Ok(())
    }

    /// Removes `id` together with its whole subtree and returns the removed
    /// ids, parent first. Unknown ids are ignored.
    pub fn remove_item(&mut self, id: &ItemId) -> Vec<ItemId> {
        if !self.nodes.contains_key(id) {
            return Vec::new();
        }
        let mut removed = vec![id.clone()];
        removed.extend(self.descendants(id));

        let doomed: HashSet<&ItemId> = removed.iter().collect();
        self.insertion.retain(|existing| !doomed.contains(existing));
        for gone in &removed {
            self.nodes.remove(gone);
        }
        self.reindex();
        self.revision += 1;
        debug!(item_id = %id, removed = removed.len(), "item removed");
        removed
    }

    /// Replaces the whole contents, e.g. when a history snapshot is restored.
    pub fn replace_all(&mut self, items: impl IntoIterator<Item = Item>) {
        self.nodes.clear();
        self.insertion.clear();
        for mut item in items {
            if item.id.is_empty() || self.nodes.contains_key(&item.id) {
                item.id = ItemId::random();
            }
            self.insert_node(item);
        }
        self.reindex();
        self.revision += 1;
    }

    /// Parent as used for tree derivation: `None` for roots, for dangling
    /// parent references and for items caught in a parent cycle.
    pub fn effective_parent(&self, id: &ItemId) -> Option<&ItemId> {
        self.parents.get(id)?.as_ref()
    }

    pub fn roots(&self) -> Vec<&Item> {
        self.collect(self.children.get(&None))
    }

    /// Children of `id` ordered by `order`, then insertion.
    pub fn children(&self, id: &ItemId) -> Vec<&Item> {
        self.collect(self.children.get(&Some(id.clone())))
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: &ItemId) -> Vec<&Item> {
        let mut out = Vec::new();
        let mut cursor = self.effective_parent(id);
        while let Some(parent) = cursor {
            if out.len() >= self.nodes.len() {
                break;
            }
            let Some(item) = self.get(parent) else {
                break;
            };
            out.push(item);
            cursor = self.effective_parent(parent);
        }
        out
    }

    /// Every item below `id`.
    pub fn descendants(&self, id: &ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut queue = vec![id.clone()];
        while let Some(current) = queue.pop() {
            if let Some(kids) = self.children.get(&Some(current)) {
                for kid in kids {
                    out.push(kid.clone());
                    queue.push(kid.clone());
                }
            }
        }
        out
    }

    fn collect(&self, ids: Option<&Vec<ItemId>>) -> Vec<&Item> {
        ids.map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    fn raw_parent(&self, id: &ItemId) -> Option<&ItemId> {
        self.nodes
            .get(id)?
            .item
            .parent_id
            .as_ref()
            .filter(|parent| self.nodes.contains_key(*parent))
    }

    fn on_cycle(&self, id: &ItemId) -> bool {
        let mut cursor = self.raw_parent(id);
        for _ in 0..self.nodes.len() {
            match cursor {
                Some(parent) if parent == id => return true,
                Some(parent) => cursor = self.raw_parent(parent),
                None => return false,
            }
        }
        false
    }

    fn reindex(&mut self) {
        let mut parents = HashMap::with_capacity(self.nodes.len());
        for id in &self.insertion {
            let parent = if self.on_cycle(id) {
                warn!(item_id = %id, "parent cycle detected; treating item as a root");
                None
            } else {
                self.raw_parent(id).cloned()
            };
            parents.insert(id.clone(), parent);
        }

        let mut children: HashMap<Option<ItemId>, Vec<ItemId>> = HashMap::new();
        for id in &self.insertion {
            let parent = parents.get(id).cloned().flatten();
            children.entry(parent).or_default().push(id.clone());
        }
        for siblings in children.values_mut() {
            siblings.sort_by_key(|id| {
                self.nodes
                    .get(id)
                    .map_or((i64::MAX, u64::MAX), |node| (node.item.order, node.seq))
            });
        }

        self.parents = parents;
        self.children = children;
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
