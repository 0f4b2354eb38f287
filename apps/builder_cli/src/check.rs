use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use serde::Serialize;
use shared::domain::{Item, ItemId};

/// Structural problem found in a persisted tree. The store repairs all of
/// these on load, so they are reported rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    DuplicateId { id: ItemId },
    DanglingParent { id: ItemId, parent_id: ItemId },
    Cycle { id: ItemId },
    ChildOfLeaf { id: ItemId, parent_id: ItemId },
    UnknownKind {
        id: ItemId,
        #[serde(rename = "item_kind")]
        kind: String,
    },
    MalformedEvent { id: ItemId, event: String, error: String },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId { id } => write!(f, "{id}: duplicate id"),
            Self::DanglingParent { id, parent_id } => {
                write!(f, "{id}: parent {parent_id} does not exist")
            }
            Self::Cycle { id } => write!(f, "{id}: parent chain loops back to itself"),
            Self::ChildOfLeaf { id, parent_id } => {
                write!(f, "{id}: parent {parent_id} is not a layout container")
            }
            Self::UnknownKind { id, kind } => write!(f, "{id}: unknown item type {kind}"),
            Self::MalformedEvent { id, event, error } => {
                write!(f, "{id}: event {event} is malformed: {error}")
            }
        }
    }
}

pub fn check_items(items: &[Item]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut by_id: HashMap<&ItemId, &Item> = HashMap::new();
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(&item.id) {
            findings.push(Finding::DuplicateId {
                id: item.id.clone(),
            });
        }
        by_id.entry(&item.id).or_insert(item);
    }

    for item in items {
        if !item.kind.is_known() {
            findings.push(Finding::UnknownKind {
                id: item.id.clone(),
                kind: item.kind.to_string(),
            });
        }
        if let Some(parent_id) = &item.parent_id {
            match by_id.get(parent_id) {
                None => findings.push(Finding::DanglingParent {
                    id: item.id.clone(),
                    parent_id: parent_id.clone(),
                }),
                Some(parent) if !parent.kind.is_layout() => {
                    findings.push(Finding::ChildOfLeaf {
                        id: item.id.clone(),
                        parent_id: parent_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }
        if on_cycle(&by_id, item) {
            findings.push(Finding::Cycle {
                id: item.id.clone(),
            });
        }
        if let Some(events) = item.props.get("events").and_then(|v| v.as_object()) {
            for event in events.keys() {
                if let Some(Err(error)) = item.event_action(event) {
                    findings.push(Finding::MalformedEvent {
                        id: item.id.clone(),
                        event: event.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }
    }
    findings
}

fn on_cycle(by_id: &HashMap<&ItemId, &Item>, item: &Item) -> bool {
    let mut cursor = item.parent_id.as_ref();
    for _ in 0..by_id.len() {
        match cursor {
            Some(parent) if parent == &item.id => return true,
            Some(parent) => cursor = by_id.get(parent).and_then(|p| p.parent_id.as_ref()),
            None => return false,
        }
    }
    false
}
