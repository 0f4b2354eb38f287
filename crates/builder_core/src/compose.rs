//! Derivation of the renderable tree from the item store for one context.

use std::collections::BTreeMap;

use expression::{contains_binding, display_value, evaluate_condition, resolve_binding};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use shared::{
    domain::{Item, ItemId, ItemKind, Position, PropMap, StyleMap},
    protocol::Action,
};
use tracing::{debug, warn};

use crate::store::ItemStore;

/// Authoring shows the tree as it is being edited; preview renders it as an
/// end user would see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Authoring,
    Preview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub style: StyleMap,
    pub props: PropMap,
    pub disabled: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub events: BTreeMap<String, Action>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    /// Display text of text-like widgets.
    pub fn text(&self) -> Option<String> {
        ["text", "label", "content", "title"]
            .iter()
            .find_map(|key| self.props.get(*key))
            .map(display_value)
    }

    pub fn find(&self, id: &ItemId) -> Option<&RenderNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

pub fn find_node<'a>(nodes: &'a [RenderNode], id: &ItemId) -> Option<&'a RenderNode> {
    nodes.iter().find_map(|node| node.find(id))
}

/// Composes the visible tree. `context` is borrowed for the whole pass, so
/// every node is evaluated against the same data.
pub fn compose(store: &ItemStore, context: &Json, mode: RenderMode) -> Vec<RenderNode> {
    let nodes: Vec<RenderNode> = store
        .roots()
        .into_iter()
        .filter_map(|item| compose_node(store, item, context, mode))
        .collect();
    debug!(items = store.len(), roots = nodes.len(), ?mode, "composed tree");
    nodes
}

pub fn compose_items(items: &[Item], context: &Json, mode: RenderMode) -> Vec<RenderNode> {
    let store = ItemStore::from_items(items.iter().cloned());
    compose(&store, context, mode)
}

pub fn is_visible(item: &Item, context: &Json) -> bool {
    match item
        .visibility
        .condition
        .as_deref()
        .filter(|condition| !condition.trim().is_empty())
    {
        Some(condition) => evaluate_condition(condition, context),
        None => item.visibility.default,
    }
}

pub fn resolve_style(item: &Item, context: &Json) -> StyleMap {
    if let Some(conditional) = &item.conditional_style {
        if let Some(hit) = conditional
            .conditions
            .iter()
            .find(|entry| evaluate_condition(&entry.when, context))
        {
            return hit.style.clone();
        }
    }
    item.style
        .clone()
        .or_else(|| item.conditional_style.as_ref().map(|c| c.default.clone()))
        .unwrap_or_default()
}

/// `props` overlaid with `conditionalProps`: values holding a `{{...}}`
/// marker are resolved as data bindings, everything else is evaluated to a
/// boolean.
pub fn resolve_props(item: &Item, context: &Json) -> PropMap {
    let mut props = item.props.clone();
    props.remove("events");
    for (name, raw) in &item.conditional_props {
        let value = if contains_binding(raw) {
            Json::String(resolve_binding(raw, context))
        } else {
            Json::Bool(evaluate_condition(raw, context))
        };
        props.insert(name.clone(), value);
    }
    props
}

fn events(item: &Item) -> BTreeMap<String, Action> {
    let Some(events) = item.props.get("events").and_then(Json::as_object) else {
        return BTreeMap::new();
    };
    events
        .iter()
        .filter_map(
            |(name, raw)| match serde_json::from_value::<Action>(raw.clone()) {
                Ok(action) => Some((name.clone(), action)),
                Err(error) => {
                    warn!(item_id = %item.id, event = %name, %error, "skipping malformed event action");
                    None
                }
            },
        )
        .collect()
}

fn compose_node(
    store: &ItemStore,
    item: &Item,
    context: &Json,
    mode: RenderMode,
) -> Option<RenderNode> {
    if !is_visible(item, context) {
        return None;
    }

    let disabled = mode == RenderMode::Preview
        && item
            .relationships
            .depends_on
            .iter()
            .any(|dependency| !store.contains(dependency));

    let children = if item.kind.is_layout() {
        store
            .children(&item.id)
            .into_iter()
            .filter_map(|child| compose_node(store, child, context, mode))
            .collect()
    } else {
        Vec::new()
    };

    let position = match store.effective_parent(&item.id) {
        None => item.position,
        Some(_) => None,
    };

    Some(RenderNode {
        id: item.id.clone(),
        kind: item.kind.clone(),
        position,
        style: resolve_style(item, context),
        props: resolve_props(item, context),
        disabled,
        events: events(item),
        children,
    })
}

#[cfg(test)]
#[path = "tests/compose_tests.rs"]
mod tests;
