pub mod bus;
pub mod compose;
pub mod config;
pub mod dispatch;
pub mod history;
pub mod session;
pub mod settle;
pub mod store;
pub mod tasks;

pub use bus::{BusEvent, EventBus, SubscriptionId, Topic, VariableStore};
pub use compose::{compose, compose_items, find_node, RenderMode, RenderNode};
pub use config::{load_settings, BuilderSettings};
pub use dispatch::{
    dispatch, dispatch_with_context, ActionHandles, DispatchOutcome, HttpClient, MountToken,
    ReqwestHttpClient, SkipReason,
};
pub use history::HistoryManager;
pub use session::BuilderSession;
pub use settle::{Immediate, SettlePolicy, SettleWindow};
pub use store::{ItemPatch, ItemStore};
pub use tasks::{HttpTaskApi, TaskApi, TaskBoard, TaskError, TaskFilter, TaskSource};
