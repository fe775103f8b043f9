//! Environment traits injected into reducers.
//!
//! All external dependencies are abstracted behind traits so reducers stay
//! deterministic: tests swap in fixed clocks, sequential ids and scripted
//! prompters, while the binary wires up the system clock and a terminal
//! prompter.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of identifiers for newly created entities
///
/// Implementations must never hand out the same value twice for the lifetime
/// of the generator.
pub trait IdGenerator: Send + Sync {
    /// Produce the next identifier
    fn next_id(&self) -> u64;
}

/// Clock-seeded, strictly increasing id generator
///
/// Ids look like millisecond timestamps, but two calls inside the same
/// millisecond (or across a clock step backwards) still get distinct values:
/// each id is `max(now_ms, previous + 1)`. Once `u64::MAX` has been handed
/// out every further call returns it again.
pub struct MonotonicIds {
    clock: Arc<dyn Clock>,
    last: AtomicU64,
}

impl MonotonicIds {
    /// Create a generator reading time from `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: AtomicU64::new(0),
        }
    }
}

impl std::fmt::Debug for MonotonicIds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonotonicIds")
            .field("last", &self.last.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl IdGenerator for MonotonicIds {
    fn next_id(&self) -> u64 {
        let now_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now_ms.max(last.saturating_add(1));
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Informational modal with a single dismiss action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Short heading
    pub title: String,
    /// Body text
    pub message: String,
}

/// Two-choice modal asking the user to approve a destructive action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Short heading
    pub title: String,
    /// Body text
    pub message: String,
    /// Label of the cancel choice (also the dismiss action)
    pub cancel_label: String,
    /// Label of the destructive choice
    pub confirm_label: String,
}

/// The user's answer to a [`Confirmation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// The destructive choice was picked
    Confirm,
    /// The cancel choice was picked or the dialog was dismissed
    Cancel,
}

impl Decision {
    /// Whether the user approved the action
    #[must_use]
    pub const fn is_confirm(self) -> bool {
        matches!(self, Self::Confirm)
    }
}

/// Presents modal notifications to the user
///
/// Both methods return futures that resolve when the user is done with the
/// dialog. A confirmation future may never resolve if the user never answers;
/// callers must not rely on a timeout.
pub trait Prompter: Send + Sync {
    /// Show an informational alert
    fn alert(&self, alert: Alert) -> BoxFuture<'static, ()>;

    /// Ask the user to confirm or cancel
    fn confirm(&self, confirmation: Confirmation) -> BoxFuture<'static, Decision>;
}

/// Prompter for contexts without a user
///
/// Alerts are logged and every confirmation resolves to the dismiss action,
/// so destructive actions never go through unattended.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessPrompter;

impl Prompter for HeadlessPrompter {
    fn alert(&self, alert: Alert) -> BoxFuture<'static, ()> {
        tracing::warn!(title = %alert.title, message = %alert.message, "alert");
        Box::pin(async {})
    }

    fn confirm(&self, confirmation: Confirmation) -> BoxFuture<'static, Decision> {
        tracing::debug!(title = %confirmation.title, "no user attached, dismissing confirmation");
        Box::pin(async { Decision::Cancel })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed list of instants, repeating the last one
    struct ReplayClock {
        instants: Mutex<VecDeque<i64>>,
    }

    impl ReplayClock {
        fn new(millis: Vec<i64>) -> Self {
            Self {
                instants: Mutex::new(millis.into()),
            }
        }
    }

    impl Clock for ReplayClock {
        #[allow(clippy::unwrap_used)]
        fn now(&self) -> DateTime<Utc> {
            let mut instants = self.instants.lock().unwrap();
            let ms = if instants.len() > 1 {
                instants.pop_front().unwrap_or(0)
            } else {
                instants.front().copied().unwrap_or(0)
            };
            Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
        }
    }

    #[test]
    fn monotonic_ids_follow_the_clock_when_it_advances() {
        let ids = MonotonicIds::new(Arc::new(ReplayClock::new(vec![1_000, 2_000, 3_000])));
        assert_eq!(ids.next_id(), 1_000);
        assert_eq!(ids.next_id(), 2_000);
        assert_eq!(ids.next_id(), 3_000);
    }

    #[test]
    fn monotonic_ids_do_not_collide_within_one_millisecond() {
        let ids = MonotonicIds::new(Arc::new(ReplayClock::new(vec![5_000])));
        let first = ids.next_id();
        let second = ids.next_id();
        let third = ids.next_id();
        assert_eq!((first, second, third), (5_000, 5_001, 5_002));
    }

    #[test]
    fn decision_is_confirm() {
        assert!(Decision::Confirm.is_confirm());
        assert!(!Decision::Cancel.is_confirm());
    }

    #[test]
    fn headless_prompter_dismisses() {
        let prompter = HeadlessPrompter;
        let decision = tokio_test::block_on(prompter.confirm(Confirmation {
            title: "Remove item".to_string(),
            message: "Sure?".to_string(),
            cancel_label: "No".to_string(),
            confirm_label: "Yes".to_string(),
        }));
        assert_eq!(decision, Decision::Cancel);
    }

    proptest! {
        #[test]
        fn monotonic_ids_strictly_increase(millis in prop::collection::vec(0i64..10_000, 1..50)) {
            let count = millis.len() * 2;
            let ids = MonotonicIds::new(Arc::new(ReplayClock::new(millis)));
            let mut previous = None;
            for _ in 0..count {
                let id = ids.next_id();
                if let Some(prev) = previous {
                    prop_assert!(id > prev);
                }
                previous = Some(id);
            }
        }
    }
}
