//! An in-memory to-do list.
//!
//! Tasks can be added, marked done, renamed and removed. Titles must be unique
//! when a task is added; a duplicate is turned away with an alert. Removal asks
//! the user first and only happens once they confirm.
//!
//! The list lives in a [`TaskListStore`]. Every change produces a new
//! [`TaskList`] snapshot; snapshots handed out earlier never change.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tasklist_core::environment::{Decision, HeadlessPrompter};
//! use tasks::{TaskEnvironment, TaskListStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = TaskListStore::new(TaskEnvironment::production(Arc::new(HeadlessPrompter)));
//!
//! let tasks = store.add_task("Buy milk").await?;
//! let id = tasks.as_slice()[0].id;
//! store.toggle_task_done(id).await?;
//!
//! // Nothing is removed until the confirmation is answered
//! let request = store.remove_task(id).await?;
//! store.resolve_removal(request.token(), Decision::Confirm).await?;
//! assert_eq!(store.task_count().await, 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod reducer;
pub mod store;
pub mod terminal;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use reducer::{TaskEnvironment, TaskReducer};
pub use store::{RemovalRequest, TaskListStore, TaskListSubscription};
pub use types::{
    ConfirmationToken, EditTask, PendingRemoval, Rejection, Task, TaskAction, TaskError, TaskId,
    TaskList, TaskState,
};
