use std::sync::{Arc, Mutex};

use shared::{error::ErrorCode, task::CategoryId};
use tokio::sync::Notify;

use super::*;
use crate::bus::Topic;

fn task(id: i64, status: TaskStatus, list: i64) -> TaskRecord {
    TaskRecord {
        id: TaskId(id),
        title: format!("task {id}"),
        status,
        priority: TaskPriority::Medium,
        due_date: None,
        todo_list_id: TodoListId(list),
        category_id: None,
        description: None,
    }
}

fn board() -> TaskBoard {
    TaskBoard::new(
        vec![
            task(1, TaskStatus::Todo, 10),
            task(2, TaskStatus::Done, 10),
            task(3, TaskStatus::Todo, 20),
        ],
        vec![Category {
            id: CategoryId(1),
            name: "Work".into(),
            color: Some("#ff0000".into()),
        }],
    )
}

/// Succeeds or fails every call, optionally waiting for a signal first.
struct FakeApi {
    fail: bool,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    fn new(fail: bool) -> Self {
        Self {
            fail,
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    async fn finish(&self, call: String) -> Result<(), TaskError> {
        self.calls.lock().expect("calls").push(call);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(TaskError::Api(ApiError::new(ErrorCode::Conflict, "rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskApi for FakeApi {
    async fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<TaskRecord, TaskError> {
        self.finish(format!("update {id}")).await?;
        let mut record = task(id.0, TaskStatus::Todo, 10);
        if let Some(title) = &update.title {
            record.title = title.clone();
        }
        Ok(record)
    }

    async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<(), TaskError> {
        self.finish(format!("status {id} {}", status.as_str())).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), TaskError> {
        self.finish(format!("delete {id}")).await
    }
}

fn status_events(bus: &EventBus) -> Arc<Mutex<Vec<TaskStatus>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(Topic::TaskStatusChanged, move |event| {
        if let BusEvent::TaskStatusChanged { status, .. } = event {
            sink.lock().expect("events").push(*status);
        }
        Ok(())
    });
    seen
}

#[test]
fn filter_by_status_and_list() {
    let board = board();
    let todo = board.filter(&TaskFilter {
        status: Some(TaskStatus::Todo),
        ..Default::default()
    });
    assert_eq!(todo.len(), 2);

    let list = board.filter(&TaskFilter {
        status: Some(TaskStatus::Todo),
        todo_list_id: Some(TodoListId(20)),
        priority: None,
    });
    assert_eq!(list.iter().map(|t| t.id).collect::<Vec<_>>(), vec![TaskId(3)]);
    assert_eq!(board.filter(&TaskFilter::default()).len(), 3);
}

#[test]
fn context_exposes_tasks_and_categories() {
    let context = board().to_context();
    assert_eq!(context["tasks"].as_array().map(Vec::len), Some(3));
    assert_eq!(context["tasks"][0]["todoListId"], serde_json::json!(10));
    assert_eq!(context["categories"][0]["name"], serde_json::json!("Work"));
    assert!(expression::evaluate_condition("{{tasks.length}} > 2", &context));
}

#[tokio::test]
async fn optimistic_status_is_kept_on_success() {
    let board = board();
    let bus = EventBus::new();
    let seen = status_events(&bus);
    let api = FakeApi::new(false);

    board
        .update_status_optimistic(TaskId(1), TaskStatus::Done, &api, &bus)
        .await
        .expect("update");
    assert_eq!(board.get(TaskId(1)).map(|t| t.status), Some(TaskStatus::Done));
    assert_eq!(*seen.lock().expect("events"), vec![TaskStatus::Done]);
    assert_eq!(*api.calls.lock().expect("calls"), vec!["status 1 done"]);
}

#[tokio::test]
async fn optimistic_status_rolls_back_on_failure() {
    let board = board();
    let bus = EventBus::new();
    let seen = status_events(&bus);
    let api = FakeApi::new(true);

    let err = board
        .update_status_optimistic(TaskId(1), TaskStatus::InProgress, &api, &bus)
        .await
        .expect_err("rejected");
    assert!(matches!(err, TaskError::Api(ref e) if e.code == ErrorCode::Conflict));
    assert_eq!(board.get(TaskId(1)).map(|t| t.status), Some(TaskStatus::Todo));
    assert_eq!(
        *seen.lock().expect("events"),
        vec![TaskStatus::InProgress, TaskStatus::Todo]
    );
}

#[tokio::test]
async fn rollback_never_clobbers_a_newer_status() {
    let board = Arc::new(board());
    let bus = Arc::new(EventBus::new());
    let gate = Arc::new(Notify::new());
    let api = Arc::new(FakeApi {
        gate: Some(Arc::clone(&gate)),
        ..FakeApi::new(true)
    });

    let pending = {
        let (board, bus, api) = (Arc::clone(&board), Arc::clone(&bus), Arc::clone(&api));
        tokio::spawn(async move {
            board
                .update_status_optimistic(TaskId(1), TaskStatus::InProgress, api.as_ref(), &bus)
                .await
        })
    };

    while api.calls.lock().expect("calls").is_empty() {
        tokio::task::yield_now().await;
    }
    // A newer change lands while the first request is still in flight.
    board.set_status(TaskId(1), TaskStatus::Done);
    gate.notify_one();

    let result = pending.await.expect("join");
    assert!(result.is_err());
    assert_eq!(board.get(TaskId(1)).map(|t| t.status), Some(TaskStatus::Done));
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let board = board();
    let bus = EventBus::new();
    let api = FakeApi::new(false);
    let err = board
        .update_status_optimistic(TaskId(99), TaskStatus::Done, &api, &bus)
        .await
        .expect_err("missing");
    assert!(matches!(err, TaskError::NotFound(TaskId(99))));
    assert!(api.calls.lock().expect("calls").is_empty());
}

#[tokio::test]
async fn failed_delete_restores_task_in_place() {
    let board = board();
    let bus = EventBus::new();
    let api = FakeApi::new(true);

    board
        .delete_task(TaskId(2), &api, &bus)
        .await
        .expect_err("rejected");
    let ids: Vec<TaskId> = board.tasks().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![TaskId(1), TaskId(2), TaskId(3)]);

    board
        .delete_task(TaskId(2), &FakeApi::new(false), &bus)
        .await
        .expect("delete");
    assert!(board.get(TaskId(2)).is_none());
}

#[tokio::test]
async fn update_task_replaces_record_and_announces() {
    let board = board();
    let bus = EventBus::new();
    let updates = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&updates);
    bus.subscribe(Topic::TasksUpdated, move |_| {
        *counter.lock().expect("count") += 1;
        Ok(())
    });

    let update = TaskUpdate {
        title: Some("renamed".into()),
        ..Default::default()
    };
    let record = board
        .update_task(TaskId(3), &update, &FakeApi::new(false), &bus)
        .await
        .expect("update");
    assert_eq!(record.title, "renamed");
    assert_eq!(board.get(TaskId(3)).map(|t| t.title), Some("renamed".to_string()));
    assert_eq!(*updates.lock().expect("count"), 1);
}
