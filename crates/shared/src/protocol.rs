use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigate,
    Notification,
    Api,
    Modal,
    Variable,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Notification => "notification",
            Self::Api => "api",
            Self::Modal => "modal",
            Self::Variable => "variable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub level: NotificationLevel,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub show_result: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModalConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VariableConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Declarative reaction to a UI event, persisted as `{type, config}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAction", into = "RawAction")]
pub enum Action {
    Navigate(NavigateConfig),
    Notification(NotificationConfig),
    Api(ApiConfig),
    Modal(ModalConfig),
    Variable(VariableConfig),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Navigate(_) => ActionKind::Navigate,
            Self::Notification(_) => ActionKind::Notification,
            Self::Api(_) => ActionKind::Api,
            Self::Modal(_) => ActionKind::Modal,
            Self::Variable(_) => ActionKind::Variable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: ActionKind,
    #[serde(default)]
    config: Value,
}

impl TryFrom<RawAction> for Action {
    type Error = serde_json::Error;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        // A missing or null config is the same as an empty one.
        let config = match raw.config {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Ok(match raw.kind {
            ActionKind::Navigate => Self::Navigate(serde_json::from_value(config)?),
            ActionKind::Notification => Self::Notification(serde_json::from_value(config)?),
            ActionKind::Api => Self::Api(serde_json::from_value(config)?),
            ActionKind::Modal => Self::Modal(serde_json::from_value(config)?),
            ActionKind::Variable => Self::Variable(serde_json::from_value(config)?),
        })
    }
}

impl From<Action> for RawAction {
    fn from(action: Action) -> Self {
        let kind = action.kind();
        let config = match action {
            Action::Navigate(config) => serde_json::to_value(config),
            Action::Notification(config) => serde_json::to_value(config),
            Action::Api(config) => serde_json::to_value(config),
            Action::Modal(config) => serde_json::to_value(config),
            Action::Variable(config) => serde_json::to_value(config),
        }
        .unwrap_or_default();
        Self { kind, config }
    }
}

/// Persisted representation of a tree: a JSON array of items.
pub fn serialize_items(items: &[Item]) -> serde_json::Result<String> {
    serde_json::to_string(items)
}

pub fn deserialize_items(raw: &str) -> serde_json::Result<Vec<Item>> {
    serde_json::from_str(raw)
}
