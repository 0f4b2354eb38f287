//! Task and category data for data-bound widgets, plus the host callbacks
//! that mutate it.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use shared::{
    error::ApiError,
    task::{Category, TaskId, TaskPriority, TaskRecord, TaskStatus, TaskStatusUpdate, TaskUpdate, TodoListId},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::bus::{BusEvent, EventBus};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(TaskId),
    #[error("task api request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("task api rejected the request: {0}")]
    Api(#[from] ApiError),
    #[error("invalid task api url: {0}")]
    Url(#[from] url::ParseError),
}

/// Read-only access to task data.
pub trait TaskSource {
    fn tasks(&self) -> Vec<TaskRecord>;
    fn categories(&self) -> Vec<Category>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo_list_id: Option<TodoListId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        self.status.map_or(true, |status| task.status == status)
            && self.todo_list_id.map_or(true, |id| task.todo_list_id == id)
            && self.priority.map_or(true, |priority| task.priority == priority)
    }
}

/// Mutation callbacks supplied by the host.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<TaskRecord, TaskError>;

    async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<(), TaskError>;

    async fn delete_task(&self, id: TaskId) -> Result<(), TaskError>;
}

#[derive(Default)]
struct BoardState {
    tasks: Vec<TaskRecord>,
    categories: Vec<Category>,
}

/// In-memory task source shared by the widgets of one page.
#[derive(Default)]
pub struct TaskBoard {
    state: RwLock<BoardState>,
}

impl TaskBoard {
    pub fn new(tasks: Vec<TaskRecord>, categories: Vec<Category>) -> Self {
        Self {
            state: RwLock::new(BoardState { tasks, categories }),
        }
    }

    pub fn replace_tasks(&self, tasks: Vec<TaskRecord>, bus: Option<&EventBus>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks = tasks;
        if let Some(bus) = bus {
            bus.publish(&BusEvent::TasksUpdated);
        }
    }

    pub fn get(&self, id: TaskId) -> Option<TaskRecord> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    pub fn filter(&self, filter: &TaskFilter) -> Vec<TaskRecord> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    /// `{"tasks": [...], "categories": [...]}` for use as composition context.
    pub fn to_context(&self) -> Json {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        json!({
            "tasks": state.tasks,
            "categories": state.categories,
        })
    }

    fn set_status(&self, id: TaskId, status: TaskStatus) -> Option<TaskStatus> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let task = state.tasks.iter_mut().find(|task| task.id == id)?;
        Some(std::mem::replace(&mut task.status, status))
    }

    /// Restores `previous` unless the task moved on from `optimistic` meanwhile.
    fn revert_status(&self, id: TaskId, optimistic: TaskStatus, previous: TaskStatus) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) if task.status == optimistic => {
                task.status = previous;
                true
            }
            _ => false,
        }
    }

    /// Applies `status` locally before the server confirms it. On failure
    /// the previous status comes back and the error is returned.
    pub async fn update_status_optimistic(
        &self,
        id: TaskId,
        status: TaskStatus,
        api: &dyn TaskApi,
        bus: &EventBus,
    ) -> Result<(), TaskError> {
        let previous = self.set_status(id, status).ok_or(TaskError::NotFound(id))?;
        bus.publish(&BusEvent::TaskStatusChanged { task_id: id, status });

        match api.update_task_status(id, status).await {
            Ok(()) => {
                debug!(task_id = %id, status = status.as_str(), "task status confirmed");
                Ok(())
            }
            Err(error) => {
                warn!(task_id = %id, error = %error, "task status update failed; rolling back");
                if self.revert_status(id, status, previous) {
                    bus.publish(&BusEvent::TaskStatusChanged {
                        task_id: id,
                        status: previous,
                    });
                }
                Err(error)
            }
        }
    }

    pub async fn update_task(
        &self,
        id: TaskId,
        update: &TaskUpdate,
        api: &dyn TaskApi,
        bus: &EventBus,
    ) -> Result<TaskRecord, TaskError> {
        if self.get(id).is_none() {
            return Err(TaskError::NotFound(id));
        }
        let updated = api.update_task(id, update).await?;
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(task) = state.tasks.iter_mut().find(|task| task.id == id) {
                *task = updated.clone();
            }
        }
        bus.publish(&BusEvent::TasksUpdated);
        Ok(updated)
    }

    /// Removes the task right away and puts it back where it was if the
    /// server refuses.
    pub async fn delete_task(
        &self,
        id: TaskId,
        api: &dyn TaskApi,
        bus: &EventBus,
    ) -> Result<(), TaskError> {
        let (index, removed) = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let index = state
                .tasks
                .iter()
                .position(|task| task.id == id)
                .ok_or(TaskError::NotFound(id))?;
            (index, state.tasks.remove(index))
        };
        bus.publish(&BusEvent::TasksUpdated);

        if let Err(error) = api.delete_task(id).await {
            warn!(task_id = %id, error = %error, "task delete failed; restoring");
            {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                let index = index.min(state.tasks.len());
                state.tasks.insert(index, removed);
            }
            bus.publish(&BusEvent::TasksUpdated);
            return Err(error);
        }
        info!(task_id = %id, "task deleted");
        Ok(())
    }
}

impl TaskSource for TaskBoard {
    fn tasks(&self) -> Vec<TaskRecord> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .clone()
    }

    fn categories(&self) -> Vec<Category> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .categories
            .clone()
    }
}

/// [`TaskApi`] over a JSON REST backend.
pub struct HttpTaskApi {
    http: Client,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(base_url: &str) -> Result<Self, TaskError> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            http: Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(response: Response) -> Result<Response, TaskError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await?;
        let error = serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| {
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            };
            ApiError::from_status(status.as_u16(), message)
        });
        Err(TaskError::Api(error))
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<TaskRecord, TaskError> {
        let base_url = &self.base_url;
        let response = self
            .http
            .patch(format!("{base_url}/tasks/{id}"))
            .json(update)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<(), TaskError> {
        let base_url = &self.base_url;
        let response = self
            .http
            .patch(format!("{base_url}/tasks/{id}/status"))
            .json(&TaskStatusUpdate { status })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), TaskError> {
        let base_url = &self.base_url;
        let response = self
            .http
            .delete(format!("{base_url}/tasks/{id}"))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/tasks_tests.rs"]
mod tests;
