//! The task list facade.
//!
//! [`TaskListStore`] wraps the generic [`Store`] with one method per
//! operation, each returning the snapshot the operation produced.

use crate::reducer::{TaskEnvironment, TaskReducer};
use crate::types::{
    ConfirmationToken, EditTask, PendingRemoval, TaskAction, TaskError, TaskId, TaskList,
    TaskState,
};
use tasklist_core::environment::Decision;
use tasklist_runtime::{EffectHandle, Store, StoreConfig, StoreError};
use tokio::sync::watch;

/// The underlying store type
pub type TaskStore = Store<TaskState, TaskAction, TaskEnvironment, TaskReducer>;

/// Owns the task collection and mediates every change to it
///
/// Clones share the same collection.
#[derive(Clone)]
pub struct TaskListStore {
    store: TaskStore,
}

impl TaskListStore {
    /// An empty task list
    #[must_use]
    pub fn new(environment: TaskEnvironment) -> Self {
        Self::with_state(TaskState::new(), environment, StoreConfig::default())
    }

    /// A task list starting from `state`
    #[must_use]
    pub fn with_state(state: TaskState, environment: TaskEnvironment, config: StoreConfig) -> Self {
        Self {
            store: Store::with_config(state, TaskReducer::new(), environment, config),
        }
    }

    /// Append a task with `title`
    ///
    /// The title is used exactly as given. Returns the new snapshot.
    ///
    /// # Errors
    ///
    /// - [`Rejection::DuplicateTitle`](crate::Rejection::DuplicateTitle) if a
    ///   task with the same title exists; the user has been alerted.
    /// - [`Rejection::EmptyTitle`](crate::Rejection::EmptyTitle) if `title` is empty.
    /// - [`Rejection::IdsExhausted`](crate::Rejection::IdsExhausted) if no unused id
    ///   could be drawn.
    /// - [`TaskError::Store`] if the store is shutting down.
    pub async fn add_task(&self, title: impl Into<String>) -> Result<TaskList, TaskError> {
        let (_handle, outcome) = self
            .store
            .send_and_read(TaskAction::AddTask { title: title.into() }, |state| {
                match &state.last_rejection {
                    Some(rejection) => Err(rejection.clone()),
                    None => Ok(state.tasks.clone()),
                }
            })
            .await?;
        Ok(outcome?)
    }

    /// Flip the done flag of task `id`; unknown ids change nothing
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn toggle_task_done(&self, id: TaskId) -> Result<TaskList, StoreError> {
        self.send_for_tasks(TaskAction::ToggleTaskDone { id }).await
    }

    /// Replace the title of a task; unknown ids change nothing
    ///
    /// The new title is not checked against other titles.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn edit_task(&self, edit: EditTask) -> Result<TaskList, StoreError> {
        self.send_for_tasks(edit.into()).await
    }

    /// Ask the user whether task `id` should be removed
    ///
    /// Nothing is removed yet. The task goes away once the confirmation is
    /// answered with [`Decision::Confirm`], either by the prompter or through
    /// [`TaskListStore::resolve_removal`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn remove_task(&self, id: TaskId) -> Result<RemovalRequest, StoreError> {
        let (handle, token) = self
            .store
            .send_and_read(TaskAction::RemoveTask { id }, TaskState::last_issued_token)
            .await?;

        Ok(RemovalRequest {
            token,
            task_id: id,
            handle,
        })
    }

    /// Answer a pending removal directly
    ///
    /// A token that is unknown or already answered changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn resolve_removal(
        &self,
        token: ConfirmationToken,
        decision: Decision,
    ) -> Result<TaskList, StoreError> {
        self.send_for_tasks(TaskAction::ResolveRemoval { token, decision })
            .await
    }

    /// Current snapshot
    pub async fn tasks(&self) -> TaskList {
        self.store.state(|state| state.tasks.clone()).await
    }

    /// Number of tasks in the current snapshot
    pub async fn task_count(&self) -> usize {
        self.store.state(TaskState::task_count).await
    }

    /// Removals still waiting for an answer, oldest first
    pub async fn pending_removals(&self) -> Vec<PendingRemoval> {
        self.store.state(TaskState::pending_removals).await
    }

    /// Wait for changes to the collection
    #[must_use]
    pub fn subscribe(&self) -> TaskListSubscription {
        TaskListSubscription {
            changes: self.store.subscribe(),
            store: self.store.clone(),
            last_seen: None,
        }
    }

    /// Stop accepting commands and wait for running effects
    ///
    /// Unanswered confirmations are effects too; they are abandoned once the
    /// configured shutdown timeout passes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects were still running
    /// when the timeout expired.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.store.shutdown_default().await
    }

    async fn send_for_tasks(&self, action: TaskAction) -> Result<TaskList, StoreError> {
        let (_handle, tasks) = self
            .store
            .send_and_read(action, |state| state.tasks.clone())
            .await?;
        Ok(tasks)
    }
}

impl std::fmt::Debug for TaskListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskListStore")
            .field("pending_effects", &self.store.pending_effects())
            .finish_non_exhaustive()
    }
}

/// A removal waiting for the user's answer
#[derive(Debug)]
pub struct RemovalRequest {
    token: ConfirmationToken,
    task_id: TaskId,
    handle: EffectHandle,
}

impl RemovalRequest {
    /// Token that answers this removal through [`TaskListStore::resolve_removal`]
    #[must_use]
    pub const fn token(&self) -> ConfirmationToken {
        self.token
    }

    /// Task that goes away if the removal is confirmed
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Wait until the prompter has answered and the answer has been applied
    ///
    /// Never returns if the user never answers.
    pub async fn answered(&mut self) {
        self.handle.wait().await;
    }

    /// Like [`RemovalRequest::answered`], giving up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if no answer arrived in time; the removal stays pending.
    #[allow(clippy::result_unit_err)]
    pub async fn answered_within(&mut self, timeout: std::time::Duration) -> Result<(), ()> {
        self.handle.wait_with_timeout(timeout).await
    }
}

/// Stream of snapshots, one per change
///
/// Changes that happen faster than the subscriber reads are coalesced: the
/// subscriber always sees the latest snapshot, never a stale one.
pub struct TaskListSubscription {
    changes: watch::Receiver<u64>,
    store: TaskStore,
    last_seen: Option<TaskList>,
}

impl TaskListSubscription {
    /// Wait for the next snapshot that differs from the last one returned
    ///
    /// Returns `None` if the change feed has closed.
    pub async fn next(&mut self) -> Option<TaskList> {
        loop {
            self.changes.changed().await.ok()?;
            let tasks = self.store.state(|state| state.tasks.clone()).await;
            if self.last_seen.as_ref().is_some_and(|seen| seen.ptr_eq(&tasks)) {
                continue;
            }
            self.last_seen = Some(tasks.clone());
            return Some(tasks);
        }
    }
}

impl std::fmt::Debug for TaskListSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskListSubscription")
            .field("last_seen", &self.last_seen)
            .finish_non_exhaustive()
    }
}
