//! Domain types for the task list.
//!
//! A task list is an ordered collection of tasks. Every change produces a new
//! [`TaskList`] value; a snapshot handed out earlier never changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tasklist_core::environment::Decision;
use tasklist_runtime::StoreError;
use thiserror::Error;

/// Unique identifier for a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    /// Accepts `42` as well as `#42`, the form the list rendering prints
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('#').unwrap_or(s).parse().map(Self)
    }
}

/// A single task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// What needs doing
    pub title: String,
    /// Whether the task is completed
    pub done: bool,
}

impl Task {
    /// Creates a new, not yet done task
    #[must_use]
    pub const fn new(id: TaskId, title: String) -> Self {
        Self {
            id,
            title,
            done: false,
        }
    }
}

/// Immutable snapshot of the task collection, in insertion order
///
/// Cloning is cheap (the tasks are shared). The store never mutates a list it
/// has handed out: every change builds a new one.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Task>", into = "Vec<Task>")]
pub struct TaskList(Arc<[Task]>);

impl TaskList {
    /// An empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no tasks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tasks in insertion order
    #[must_use]
    pub fn as_slice(&self) -> &[Task] {
        &self.0
    }

    /// Iterate over the tasks in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.0.iter()
    }

    /// Look up a task by id
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.0.iter().find(|task| task.id == id)
    }

    /// Look up a task by exact title (case-sensitive, untrimmed)
    #[must_use]
    pub fn find_by_title(&self, title: &str) -> Option<&Task> {
        self.0.iter().find(|task| task.title == title)
    }

    /// Number of tasks marked done
    #[must_use]
    pub fn done_count(&self) -> usize {
        self.0.iter().filter(|task| task.done).count()
    }

    /// Whether the snapshots share storage (no change happened in between)
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Copy with `task` appended at the end
    pub(crate) fn with_appended(&self, task: Task) -> Self {
        self.0.iter().cloned().chain(std::iter::once(task)).collect()
    }

    /// Copy with the task `id` changed by `update`, or `None` if there is no such task
    ///
    /// An update that leaves the task as it was returns this same snapshot.
    pub(crate) fn with_updated(&self, id: TaskId, update: impl FnOnce(&mut Task)) -> Option<Self> {
        let mut tasks = self.0.to_vec();
        let task = tasks.iter_mut().find(|task| task.id == id)?;
        let original = task.clone();
        update(task);
        if *task == original {
            return Some(self.clone());
        }
        Some(tasks.into())
    }

    /// Copy without the task `id`, or this same snapshot if there is no such task
    pub(crate) fn without(&self, id: TaskId) -> Self {
        if self.get(id).is_none() {
            return self.clone();
        }
        self.0.iter().filter(|task| task.id != id).cloned().collect()
    }
}

impl From<Vec<Task>> for TaskList {
    fn from(tasks: Vec<Task>) -> Self {
        Self(tasks.into())
    }
}

impl From<TaskList> for Vec<Task> {
    fn from(list: TaskList) -> Self {
        list.0.to_vec()
    }
}

impl FromIterator<Task> for TaskList {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Arguments of an edit: which task and its replacement title
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditTask {
    /// Task to rename
    pub task_id: TaskId,
    /// Replacement title
    pub new_title: String,
}

/// Identifies one removal waiting for the user's answer
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationToken(pub u64);

impl std::fmt::Display for ConfirmationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "confirmation-{}", self.0)
    }
}

/// A removal the user has not answered yet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRemoval {
    /// Token to resolve the removal with
    pub token: ConfirmationToken,
    /// Task that goes away if the user confirms
    pub task_id: TaskId,
}

/// Why an add was turned down
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// A task with exactly this title already exists
    #[error("a task titled {title:?} already exists")]
    DuplicateTitle {
        /// The offending title
        title: String,
    },

    /// The title was empty
    #[error("task title cannot be empty")]
    EmptyTitle,

    /// The id generator only produced ids that are already taken
    #[error("no unused task id left")]
    IdsExhausted,
}

/// Errors surfaced by [`crate::TaskListStore`]
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TaskError {
    /// The add was rejected; the collection is unchanged
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The store no longer accepts commands
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// State owned by the task store
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    /// Current snapshot of the collection
    pub tasks: TaskList,
    /// Removals waiting for an answer, by token
    pub pending_removals: BTreeMap<ConfirmationToken, TaskId>,
    /// Next confirmation token to hand out
    pub next_token: u64,
    /// Outcome of the last add, if it was rejected
    pub last_rejection: Option<Rejection>,
}

impl TaskState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state holding `tasks`
    #[must_use]
    pub fn with_tasks(tasks: impl Into<TaskList>) -> Self {
        Self {
            tasks: tasks.into(),
            ..Self::default()
        }
    }

    /// Number of tasks, recomputed on every call
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// The removal requested most recently, if still unanswered
    #[must_use]
    pub fn latest_pending_removal(&self) -> Option<PendingRemoval> {
        let token = ConfirmationToken(self.next_token.checked_sub(1)?);
        self.pending_removals
            .get(&token)
            .map(|&task_id| PendingRemoval { token, task_id })
    }

    /// Token handed out by the most recent removal request
    ///
    /// Reducing `RemoveTask` always advances `next_token`, so right after one
    /// this names the request it created.
    #[must_use]
    pub const fn last_issued_token(&self) -> ConfirmationToken {
        ConfirmationToken(self.next_token.wrapping_sub(1))
    }

    /// All unanswered removals, oldest first
    #[must_use]
    pub fn pending_removals(&self) -> Vec<PendingRemoval> {
        self.pending_removals
            .iter()
            .map(|(&token, &task_id)| PendingRemoval { token, task_id })
            .collect()
    }
}

/// Everything the task reducer reacts to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskAction {
    /// Append a task, unless one with the same title exists
    AddTask {
        /// Title of the new task
        title: String,
    },

    /// Flip the done flag of a task
    ToggleTaskDone {
        /// Task to toggle
        id: TaskId,
    },

    /// Replace the title of a task
    EditTask {
        /// Task to rename
        task_id: TaskId,
        /// Replacement title
        new_title: String,
    },

    /// Ask the user whether a task should be removed
    RemoveTask {
        /// Task to remove
        id: TaskId,
    },

    /// The user answered a removal confirmation
    ResolveRemoval {
        /// Which confirmation was answered
        token: ConfirmationToken,
        /// The answer
        decision: Decision,
    },
}

impl From<EditTask> for TaskAction {
    fn from(edit: EditTask) -> Self {
        Self::EditTask {
            task_id: edit.task_id,
            new_title: edit.new_title,
        }
    }
}
