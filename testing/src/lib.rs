//! # Task List Testing
//!
//! Testing utilities and helpers for the task list store.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits
//!   ([`FixedClock`], [`SequentialIds`], [`ScriptedPrompter`])
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tasklist_testing::{ScriptedPrompter, SequentialIds};
//!
//! #[tokio::test]
//! async fn removal_waits_for_confirmation() {
//!     let prompter = ScriptedPrompter::new();
//!     let env = TaskEnvironment::new(Arc::new(SequentialIds::new()), Arc::new(prompter.clone()));
//!     // ...
//! }
//! ```

use chrono::{DateTime, Utc};
use tasklist_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Deterministic implementations of the environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use futures::future::BoxFuture;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use tasklist_core::environment::{Alert, Confirmation, Decision, IdGenerator, Prompter};
    use tokio::sync::oneshot;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use tasklist_testing::mocks::FixedClock;
    /// use tasklist_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .map(|time| time.with_timezone(&Utc))
                .unwrap_or_default(),
        )
    }

    /// Predictable ids: 1, 2, 3, ...
    #[derive(Debug)]
    pub struct SequentialIds {
        next: AtomicU64,
    }

    impl SequentialIds {
        /// Start counting at 1
        #[must_use]
        pub const fn new() -> Self {
            Self::starting_at(1)
        }

        /// Start counting at `first`
        #[must_use]
        pub const fn starting_at(first: u64) -> Self {
            Self {
                next: AtomicU64::new(first),
            }
        }
    }

    impl Default for SequentialIds {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> u64 {
            self.next.fetch_add(1, Ordering::SeqCst)
        }
    }

    /// How the [`ScriptedPrompter`] answers the next confirmation
    enum Answer {
        Decide(Decision),
        Later(oneshot::Receiver<Decision>),
    }

    #[derive(Default)]
    struct Script {
        alerts: Vec<Alert>,
        confirmations: Vec<Confirmation>,
        answers: VecDeque<Answer>,
    }

    /// Prompter that records what was shown and answers from a script
    ///
    /// Confirmations take the next scripted answer in order. When the script
    /// is exhausted the confirmation is never answered, like a user who walks
    /// away from the dialog. Clones share the same script and recordings.
    #[derive(Clone, Default)]
    pub struct ScriptedPrompter {
        script: Arc<Mutex<Script>>,
    }

    impl ScriptedPrompter {
        /// A prompter with an empty script
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A prompter that answers the next confirmations with `decisions`
        #[must_use]
        pub fn answering(decisions: impl IntoIterator<Item = Decision>) -> Self {
            let prompter = Self::new();
            for decision in decisions {
                prompter.push_answer(decision);
            }
            prompter
        }

        /// Queue an immediate answer
        pub fn push_answer(&self, decision: Decision) {
            self.lock().answers.push_back(Answer::Decide(decision));
        }

        /// Queue an answer the test gives later through the returned sender
        ///
        /// Dropping the sender without sending counts as dismissing the
        /// dialog.
        #[must_use]
        pub fn push_deferred(&self) -> oneshot::Sender<Decision> {
            let (tx, rx) = oneshot::channel();
            self.lock().answers.push_back(Answer::Later(rx));
            tx
        }

        /// Alerts shown so far
        #[must_use]
        pub fn alerts(&self) -> Vec<Alert> {
            self.lock().alerts.clone()
        }

        /// Confirmations requested so far
        #[must_use]
        pub fn confirmations(&self) -> Vec<Confirmation> {
            self.lock().confirmations.clone()
        }

        fn lock(&self) -> MutexGuard<'_, Script> {
            self.script.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl std::fmt::Debug for ScriptedPrompter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let script = self.lock();
            f.debug_struct("ScriptedPrompter")
                .field("alerts", &script.alerts.len())
                .field("confirmations", &script.confirmations.len())
                .field("queued_answers", &script.answers.len())
                .finish()
        }
    }

    impl Prompter for ScriptedPrompter {
        fn alert(&self, alert: Alert) -> BoxFuture<'static, ()> {
            self.lock().alerts.push(alert);
            Box::pin(async {})
        }

        fn confirm(&self, confirmation: Confirmation) -> BoxFuture<'static, Decision> {
            let answer = {
                let mut script = self.lock();
                script.confirmations.push(confirmation);
                script.answers.pop_front()
            };

            match answer {
                Some(Answer::Decide(decision)) => Box::pin(async move { decision }),
                Some(Answer::Later(rx)) => Box::pin(async move {
                    rx.await.unwrap_or(Decision::Cancel)
                }),
                None => Box::pin(std::future::pending()),
            }
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ScriptedPrompter, SequentialIds, test_clock};
