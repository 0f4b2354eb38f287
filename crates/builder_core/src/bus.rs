//! Typed publish/subscribe between widgets and the host.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use serde::Serialize;
use serde_json::Value as Json;
use shared::task::{TaskId, TaskStatus};
use tracing::{debug, warn};

use crate::{dispatch::VariableSink, tasks::TaskFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    TasksUpdated,
    FilterChanged,
    TaskStatusChanged,
    VariableChanged,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TasksUpdated => "tasks-updated",
            Self::FilterChanged => "filter-change",
            Self::TaskStatusChanged => "task-status-changed",
            Self::VariableChanged => "variable-changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "topic", rename_all = "kebab-case")]
pub enum BusEvent {
    TasksUpdated,
    FilterChanged {
        filter: TaskFilter,
    },
    TaskStatusChanged {
        task_id: TaskId,
        status: TaskStatus,
    },
    VariableChanged {
        name: String,
        value: Json,
    },
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            Self::TasksUpdated => Topic::TasksUpdated,
            Self::FilterChanged { .. } => Topic::FilterChanged,
            Self::TaskStatusChanged { .. } => Topic::TaskStatusChanged,
            Self::VariableChanged { .. } => Topic::VariableChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub type Listener = Arc<dyn Fn(&BusEvent) -> anyhow::Result<()> + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    listener: Listener,
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, listener: F) -> SubscriptionId
    where
        F: Fn(&BusEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id,
                topic,
                listener: Arc::new(listener),
            });
        debug!(topic = topic.as_str(), subscription = id.0, "subscribed");
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        subscriptions.len() != before
    }

    /// Delivers `event` to every listener of its topic in subscription order
    /// and returns how many handled it without error.
    pub fn publish(&self, event: &BusEvent) -> usize {
        let topic = event.topic();
        // Listeners may subscribe or unsubscribe while being called.
        let listeners: Vec<(SubscriptionId, Listener)> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|subscription| subscription.topic == topic)
            .map(|subscription| (subscription.id, Arc::clone(&subscription.listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in listeners {
            match listener(event) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    warn!(topic = topic.as_str(), subscription = id.0, error = %error, "bus listener failed");
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|subscription| subscription.topic == topic)
            .count()
    }
}

/// Page variables set by `variable` actions. Every change is announced on
/// the bus.
pub struct VariableStore {
    values: RwLock<BTreeMap<String, Json>>,
    bus: Arc<EventBus>,
}

impl VariableStore {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            values: RwLock::new(BTreeMap::new()),
            bus,
        }
    }

    pub fn get(&self, name: &str) -> Option<Json> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// All variables as one JSON object, for use as composition context.
    pub fn snapshot(&self) -> Json {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Json::Object(
            values
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }
}

impl VariableSink for VariableStore {
    fn set_variable(&self, name: &str, value: Json) -> anyhow::Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.clone());
        self.bus.publish(&BusEvent::VariableChanged {
            name: name.to_string(),
            value,
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/bus_tests.rs"]
mod tests;
