use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol::Action;

pub type StyleMap = Map<String, Value>;
pub type PropMap = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Fresh UUID v4 id for items created by the builder.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Widget/container tag. Layout kinds may parent other items and place them
/// by flow; every other kind is a leaf. Tags this build does not know are
/// kept verbatim so they survive a save.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    Container,
    Row,
    Column,
    Grid,
    Card,
    Form,
    Text,
    Heading,
    Button,
    Input,
    Checkbox,
    Select,
    Image,
    Divider,
    TaskList,
    TaskBoard,
    Calendar,
    Unknown(String),
}

impl ItemKind {
    pub fn is_layout(&self) -> bool {
        matches!(
            self,
            Self::Container | Self::Row | Self::Column | Self::Grid | Self::Card | Self::Form
        )
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Container => "container",
            Self::Row => "row",
            Self::Column => "column",
            Self::Grid => "grid",
            Self::Card => "card",
            Self::Form => "form",
            Self::Text => "text",
            Self::Heading => "heading",
            Self::Button => "button",
            Self::Input => "input",
            Self::Checkbox => "checkbox",
            Self::Select => "select",
            Self::Image => "image",
            Self::Divider => "divider",
            Self::TaskList => "task_list",
            Self::TaskBoard => "task_board",
            Self::Calendar => "calendar",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<String> for ItemKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "container" => Self::Container,
            "row" => Self::Row,
            "column" => Self::Column,
            "grid" => Self::Grid,
            "card" => Self::Card,
            "form" => Self::Form,
            "text" => Self::Text,
            "heading" => Self::Heading,
            "button" => Self::Button,
            "input" => Self::Input,
            "checkbox" => Self::Checkbox,
            "select" => Self::Select,
            "image" => Self::Image,
            "divider" => Self::Divider,
            "task_list" => Self::TaskList,
            "task_board" => Self::TaskBoard,
            "calendar" => Self::Calendar,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Unknown(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Snaps both axes to the nearest multiple of `grid`. A non-positive grid
    /// leaves the position untouched.
    pub fn snapped(self, grid: f64) -> Self {
        if grid <= 0.0 || !grid.is_finite() {
            return self;
        }
        Self {
            x: (self.x / grid).round() * grid,
            y: (self.y / grid).round() * grid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default = "default_visible")]
    pub default: bool,
}

fn default_visible() -> bool {
    true
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            condition: None,
            default: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleCondition {
    pub when: String,
    #[serde(default)]
    pub style: StyleMap,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalStyle {
    #[serde(default)]
    pub conditions: Vec<StyleCondition>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub default: StyleMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationships {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affects: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ItemId>,
}

impl Relationships {
    pub fn is_empty(&self) -> bool {
        self.depends_on.is_empty() && self.affects.is_empty() && self.references.is_empty()
    }
}

/// One node of the component tree as it is stored and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleMap>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: PropMap,
    #[serde(default)]
    pub metadata: ItemMetadata,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_style: Option<ConditionalStyle>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conditional_props: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Relationships::is_empty")]
    pub relationships: Relationships,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            kind,
            parent_id: None,
            order: 0,
            position: None,
            style: None,
            props: Map::new(),
            metadata: ItemMetadata::default(),
            visibility: Visibility::default(),
            conditional_style: None,
            conditional_props: BTreeMap::new(),
            relationships: Relationships::default(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<ItemId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    pub fn with_visibility_condition(mut self, condition: impl Into<String>) -> Self {
        self.visibility.condition = Some(condition.into());
        self
    }

    /// The action configured for `event` under `props.events`, if any.
    pub fn event_action(&self, event: &str) -> Option<Result<Action, serde_json::Error>> {
        let raw = self.props.get("events")?.as_object()?.get(event)?;
        Some(serde_json::from_value(raw.clone()))
    }
}
