//! Reducer logic for the task list.
//!
//! Adds, toggles and edits are decided synchronously. A removal is a two-step
//! exchange: `RemoveTask` records a pending confirmation and asks the user,
//! and the answer comes back as `ResolveRemoval`.

use crate::types::{ConfirmationToken, Rejection, Task, TaskAction, TaskId, TaskState};
use std::sync::Arc;
use tasklist_core::{
    SmallVec,
    effect::Effect,
    environment::{
        Alert, Confirmation, Decision, IdGenerator, MonotonicIds, Prompter, SystemClock,
    },
    reducer::Reducer,
    smallvec,
};

/// Environment dependencies for the task reducer
#[derive(Clone)]
pub struct TaskEnvironment {
    /// Source of task ids
    pub ids: Arc<dyn IdGenerator>,
    /// Shows alerts and asks for confirmations
    pub prompter: Arc<dyn Prompter>,
}

impl TaskEnvironment {
    /// Creates a new `TaskEnvironment`
    #[must_use]
    pub const fn new(ids: Arc<dyn IdGenerator>, prompter: Arc<dyn Prompter>) -> Self {
        Self { ids, prompter }
    }

    /// Clock-seeded ids and the given prompter
    #[must_use]
    pub fn production(prompter: Arc<dyn Prompter>) -> Self {
        Self::new(Arc::new(MonotonicIds::new(Arc::new(SystemClock))), prompter)
    }
}

impl std::fmt::Debug for TaskEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskEnvironment").finish_non_exhaustive()
    }
}

/// Alert shown when an add repeats an existing title
#[must_use]
pub fn duplicate_title_alert() -> Alert {
    Alert {
        title: "Task already registered".to_string(),
        message: "You cannot register more than one task with the same name".to_string(),
    }
}

/// Confirmation shown before a task is removed
#[must_use]
pub fn removal_confirmation() -> Confirmation {
    Confirmation {
        title: "Remove item".to_string(),
        message: "Are you sure you want to remove this task?".to_string(),
        cancel_label: "No".to_string(),
        confirm_label: "Yes".to_string(),
    }
}

/// Reducer for the task list
#[derive(Clone, Debug, Default)]
pub struct TaskReducer;

impl TaskReducer {
    /// Creates a new `TaskReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates an `AddTask` command
    fn validate_add_task(state: &TaskState, title: &str) -> Result<(), Rejection> {
        if title.is_empty() {
            return Err(Rejection::EmptyTitle);
        }

        if state.tasks.find_by_title(title).is_some() {
            return Err(Rejection::DuplicateTitle {
                title: title.to_string(),
            });
        }

        Ok(())
    }

    /// Draws ids until one is not taken by an existing task
    ///
    /// Gives up after one draw more than there are tasks, which is enough for
    /// any generator that keeps its ids distinct.
    fn fresh_id(state: &TaskState, env: &TaskEnvironment) -> Option<TaskId> {
        (0..=state.task_count()).find_map(|_| {
            let id = TaskId(env.ids.next_id());
            if state.tasks.get(id).is_none() {
                return Some(id);
            }
            tracing::warn!(%id, "id generator returned an id already in use");
            None
        })
    }

    fn add_task(
        state: &mut TaskState,
        title: String,
        env: &TaskEnvironment,
    ) -> SmallVec<[Effect<TaskAction>; 4]> {
        if let Err(rejection) = Self::validate_add_task(state, &title) {
            tracing::debug!(%rejection, "add rejected");
            let effects = match rejection {
                Rejection::DuplicateTitle { .. } => {
                    let alert = env.prompter.alert(duplicate_title_alert());
                    smallvec![Effect::future(async move {
                        alert.await;
                        None
                    })]
                },
                Rejection::EmptyTitle | Rejection::IdsExhausted => SmallVec::new(),
            };
            state.last_rejection = Some(rejection);
            return effects;
        }

        let Some(id) = Self::fresh_id(state, env) else {
            tracing::error!(%title, "no unused task id left");
            state.last_rejection = Some(Rejection::IdsExhausted);
            return SmallVec::new();
        };
        tracing::debug!(%id, "task added");
        state.tasks = state.tasks.with_appended(Task::new(id, title));
        state.last_rejection = None;
        SmallVec::new()
    }

    fn request_removal(
        state: &mut TaskState,
        id: TaskId,
        env: &TaskEnvironment,
    ) -> SmallVec<[Effect<TaskAction>; 4]> {
        let token = ConfirmationToken(state.next_token);
        state.next_token += 1;
        state.pending_removals.insert(token, id);
        tracing::debug!(%id, %token, "removal awaiting confirmation");

        let answer = env.prompter.confirm(removal_confirmation());
        smallvec![Effect::future(async move {
            let decision = answer.await;
            Some(TaskAction::ResolveRemoval { token, decision })
        })]
    }

    fn resolve_removal(state: &mut TaskState, token: ConfirmationToken, decision: Decision) {
        let Some(id) = state.pending_removals.remove(&token) else {
            tracing::debug!(%token, "ignoring answer to unknown confirmation");
            return;
        };

        if decision.is_confirm() {
            tracing::debug!(%id, %token, "removal confirmed");
            state.tasks = state.tasks.without(id);
        } else {
            tracing::debug!(%id, %token, "removal cancelled");
        }
    }
}

impl Reducer for TaskReducer {
    type State = TaskState;
    type Action = TaskAction;
    type Environment = TaskEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TaskAction::AddTask { title } => Self::add_task(state, title, env),

            TaskAction::ToggleTaskDone { id } => {
                match state.tasks.with_updated(id, |task| task.done = !task.done) {
                    Some(tasks) => state.tasks = tasks,
                    None => tracing::debug!(%id, "toggle of unknown task ignored"),
                }
                SmallVec::new()
            },

            TaskAction::EditTask { task_id, new_title } => {
                match state
                    .tasks
                    .with_updated(task_id, |task| task.title = new_title)
                {
                    Some(tasks) => state.tasks = tasks,
                    None => tracing::debug!(id = %task_id, "edit of unknown task ignored"),
                }
                SmallVec::new()
            },

            TaskAction::RemoveTask { id } => Self::request_removal(state, id, env),

            TaskAction::ResolveRemoval { token, decision } => {
                Self::resolve_removal(state, token, decision);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::types::TaskList;
    use tasklist_testing::{ReducerTest, ScriptedPrompter, SequentialIds, assertions};

    fn test_env(prompter: &ScriptedPrompter) -> TaskEnvironment {
        TaskEnvironment::new(Arc::new(SequentialIds::new()), Arc::new(prompter.clone()))
    }

    fn state_with(titles: &[&str]) -> TaskState {
        let tasks: TaskList = titles
            .iter()
            .zip(1..)
            .map(|(title, id)| Task::new(TaskId(id), (*title).to_string()))
            .collect();
        TaskState::with_tasks(tasks)
    }

    fn titles(state: &TaskState) -> Vec<String> {
        state.tasks.iter().map(|task| task.title.clone()).collect()
    }

    #[test]
    fn test_add_task_success() {
        let prompter = ScriptedPrompter::new();

        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&prompter))
            .given_state(TaskState::new())
            .when_action(TaskAction::AddTask {
                title: "Buy milk".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.task_count(), 1);
                let task = &state.tasks.as_slice()[0];
                assert_eq!(task.id, TaskId(1));
                assert_eq!(task.title, "Buy milk");
                assert!(!task.done);
                assert_eq!(state.last_rejection, None);
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        assert!(prompter.alerts().is_empty());
    }

    #[test]
    fn test_add_task_appends_in_order() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::AddTask {
                title: "Walk dog".to_string(),
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["Buy milk", "Walk dog"]);
            })
            .run();
    }

    #[test]
    fn test_add_task_duplicate_title_alerts() {
        let prompter = ScriptedPrompter::new();
        let shown = prompter.clone();

        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&prompter))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::AddTask {
                title: "Buy milk".to_string(),
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["Buy milk"]);
                assert_eq!(
                    state.last_rejection,
                    Some(Rejection::DuplicateTitle {
                        title: "Buy milk".to_string()
                    })
                );
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();

        assert_eq!(shown.alerts(), vec![duplicate_title_alert()]);
    }

    #[test]
    fn test_add_task_title_match_is_exact() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::AddTask {
                title: "buy milk".to_string(),
            })
            .when_action(TaskAction::AddTask {
                title: "Buy milk ".to_string(),
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["Buy milk", "buy milk", "Buy milk "]);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_add_task_empty_title_rejected_silently() {
        let prompter = ScriptedPrompter::new();

        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&prompter))
            .given_state(TaskState::new())
            .when_action(TaskAction::AddTask {
                title: String::new(),
            })
            .then_state(|state| {
                assert!(state.tasks.is_empty());
                assert_eq!(state.last_rejection, Some(Rejection::EmptyTitle));
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        assert!(prompter.alerts().is_empty());
    }

    #[test]
    fn test_successful_add_clears_rejection() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(TaskState::new())
            .when_action(TaskAction::AddTask {
                title: String::new(),
            })
            .when_action(TaskAction::AddTask {
                title: "Buy milk".to_string(),
            })
            .then_state(|state| assert_eq!(state.last_rejection, None))
            .run();
    }

    #[test]
    fn test_add_task_skips_ids_in_use() {
        // SequentialIds starts at 1, which the seeded task already holds
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::AddTask {
                title: "Walk dog".to_string(),
            })
            .then_state(|state| {
                let ids: Vec<_> = state.tasks.iter().map(|task| task.id).collect();
                assert_eq!(ids, [TaskId(1), TaskId(2)]);
            })
            .run();
    }

    #[test]
    fn test_toggle_task_done_flips_flag() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk", "Walk dog"]))
            .when_action(TaskAction::ToggleTaskDone { id: TaskId(2) })
            .then_state(|state| {
                assert!(!state.tasks.get(TaskId(1)).unwrap().done);
                assert!(state.tasks.get(TaskId(2)).unwrap().done);
                assert_eq!(titles(state), ["Buy milk", "Walk dog"]);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_toggle_twice_restores() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::ToggleTaskDone { id: TaskId(1) })
            .when_action(TaskAction::ToggleTaskDone { id: TaskId(1) })
            .then_state(|state| assert!(!state.tasks.get(TaskId(1)).unwrap().done))
            .run();
    }

    #[test]
    fn test_toggle_unknown_id_is_noop() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::ToggleTaskDone { id: TaskId(99) })
            .then_state(|state| assert_eq!(*state, state_with(&["Buy milk"])))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_edit_task_replaces_title() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk", "Walk dog"]))
            .when_action(TaskAction::EditTask {
                task_id: TaskId(1),
                new_title: "Buy oat milk".to_string(),
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["Buy oat milk", "Walk dog"]);
                assert!(!state.tasks.get(TaskId(1)).unwrap().done);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_edit_task_allows_duplicate_and_empty_titles() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk", "Walk dog"]))
            .when_action(TaskAction::EditTask {
                task_id: TaskId(2),
                new_title: "Buy milk".to_string(),
            })
            .when_action(TaskAction::EditTask {
                task_id: TaskId(1),
                new_title: String::new(),
            })
            .then_state(|state| assert_eq!(titles(state), ["", "Buy milk"]))
            .run();
    }

    #[test]
    fn test_edit_unknown_id_is_noop() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::EditTask {
                task_id: TaskId(7),
                new_title: "X".to_string(),
            })
            .then_state(|state| assert_eq!(titles(state), ["Buy milk"]))
            .run();
    }

    #[test]
    fn test_remove_task_asks_for_confirmation() {
        let prompter = ScriptedPrompter::new();
        let shown = prompter.clone();

        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&prompter))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::RemoveTask { id: TaskId(1) })
            .then_state(|state| {
                assert_eq!(state.task_count(), 1);
                assert_eq!(
                    state.pending_removals.get(&ConfirmationToken(0)),
                    Some(&TaskId(1))
                );
                assert_eq!(state.next_token, 1);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();

        assert_eq!(shown.confirmations(), vec![removal_confirmation()]);
    }

    #[test]
    fn test_remove_unknown_id_still_asks() {
        let prompter = ScriptedPrompter::new();
        let shown = prompter.clone();

        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&prompter))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::RemoveTask { id: TaskId(42) })
            .then_effects(assertions::assert_has_future_effect)
            .run();

        assert_eq!(shown.confirmations().len(), 1);
    }

    #[test]
    fn test_confirmed_removal_drops_task() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk", "Walk dog", "Read"]))
            .when_action(TaskAction::RemoveTask { id: TaskId(2) })
            .when_action(TaskAction::ResolveRemoval {
                token: ConfirmationToken(0),
                decision: Decision::Confirm,
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["Buy milk", "Read"]);
                assert!(state.pending_removals.is_empty());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_cancelled_removal_keeps_task() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::RemoveTask { id: TaskId(1) })
            .when_action(TaskAction::ResolveRemoval {
                token: ConfirmationToken(0),
                decision: Decision::Cancel,
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["Buy milk"]);
                assert!(state.pending_removals.is_empty());
            })
            .run();
    }

    #[test]
    fn test_stale_token_is_ignored() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["Buy milk"]))
            .when_action(TaskAction::RemoveTask { id: TaskId(1) })
            .when_action(TaskAction::ResolveRemoval {
                token: ConfirmationToken(0),
                decision: Decision::Cancel,
            })
            .when_action(TaskAction::ResolveRemoval {
                token: ConfirmationToken(0),
                decision: Decision::Confirm,
            })
            .then_state(|state| assert_eq!(titles(state), ["Buy milk"]))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_pending_removals_resolve_independently() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["a", "b", "c"]))
            .when_action(TaskAction::RemoveTask { id: TaskId(1) })
            .when_action(TaskAction::RemoveTask { id: TaskId(3) })
            .when_action(TaskAction::ResolveRemoval {
                token: ConfirmationToken(1),
                decision: Decision::Confirm,
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["a", "b"]);
                assert_eq!(
                    state.pending_removals.get(&ConfirmationToken(0)),
                    Some(&TaskId(1))
                );
            })
            .run();
    }

    /// Generator stuck on its last value
    struct StuckIds;

    impl IdGenerator for StuckIds {
        fn next_id(&self) -> u64 {
            u64::MAX
        }
    }

    #[test]
    fn test_add_task_rejected_when_ids_are_exhausted() {
        let prompter = ScriptedPrompter::new();
        let taken: TaskList = std::iter::once(Task::new(TaskId(u64::MAX), "a".to_string()))
            .collect();

        ReducerTest::new(TaskReducer::new())
            .with_env(TaskEnvironment::new(Arc::new(StuckIds), Arc::new(prompter.clone())))
            .given_state(TaskState::with_tasks(taken))
            .when_action(TaskAction::AddTask {
                title: "b".to_string(),
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["a"]);
                assert_eq!(state.last_rejection, Some(Rejection::IdsExhausted));
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        assert!(prompter.alerts().is_empty());
    }

    #[test]
    fn test_confirmed_removal_of_missing_task_changes_nothing() {
        ReducerTest::new(TaskReducer::new())
            .with_env(test_env(&ScriptedPrompter::new()))
            .given_state(state_with(&["a"]))
            .when_action(TaskAction::RemoveTask { id: TaskId(9) })
            .when_action(TaskAction::ResolveRemoval {
                token: ConfirmationToken(0),
                decision: Decision::Confirm,
            })
            .then_state(|state| assert_eq!(titles(state), ["a"]))
            .run();
    }

    #[test]
    fn test_removal_effect_feeds_back_the_answer() {
        let prompter = ScriptedPrompter::answering([Decision::Confirm]);
        let env = test_env(&prompter);
        let mut state = state_with(&["Buy milk"]);

        let mut effects = TaskReducer::new().reduce(
            &mut state,
            TaskAction::RemoveTask { id: TaskId(1) },
            &env,
        );

        let Some(Effect::Future(fut)) = effects.pop() else {
            panic!("expected a future effect");
        };
        assert_eq!(
            tokio_test::block_on(fut),
            Some(TaskAction::ResolveRemoval {
                token: ConfirmationToken(0),
                decision: Decision::Confirm,
            })
        );
    }
}
