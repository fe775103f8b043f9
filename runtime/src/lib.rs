//! # Task List Runtime
//!
//! Runtime implementation for the task list store.
//!
//! This crate provides the [`Store`] that coordinates reducer execution and
//! effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Owns the state, serialises reducer calls and executes effects
//! - **Effect Executor**: Runs effect futures and feeds their actions back
//! - **Change feed**: A `watch` channel bumped after every reduction so
//!   presentation code can re-render from fresh snapshots
//!
//! ## Example
//!
//! ```ignore
//! use tasklist_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(TaskAction::AddTask { title }).await?;
//!
//! // Read state
//! let count = store.state(|s| s.task_count()).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tasklist_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{RwLock, watch};

/// Store failures
pub mod error {
    use thiserror::Error;

    /// Why a store call could not be carried out
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// `send()` was called after `shutdown()` started
        #[error("store is shutting down")]
        ShutdownInProgress,

        /// Effects were still in flight when the shutdown deadline passed
        ///
        /// Some effects were still running when the timeout elapsed, for
        /// example a confirmation the user never answered.
        #[error("shutdown deadline passed with {0} effects in flight")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Tunables for a [`Store`]
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tasklist_runtime::StoreConfig;
///
/// let config = StoreConfig::default().with_shutdown_timeout(Duration::from_secs(2));
/// assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Deadline used by [`Store::shutdown_default`]
    pub shutdown_timeout: Duration,
    /// How often shutdown re-checks the pending effect count
    pub shutdown_poll_interval: Duration,
}

impl StoreConfig {
    /// Override the shutdown deadline
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Override the shutdown poll interval
    #[must_use]
    pub const fn with_shutdown_poll_interval(mut self, interval: Duration) -> Self {
        self.shutdown_poll_interval = interval;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
            shutdown_poll_interval: Duration::from_millis(20),
        }
    }
}

/// Completion tracker for the effects of one action
///
/// Returned by [`Store::send()`] to allow waiting for the effects of that
/// action to complete. An effect counts as complete once its future has
/// resolved and, if it produced an action, that action has been reduced.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(TaskAction::RemoveTask { id }).await?;
/// handle.wait().await;
/// // the confirmation was answered and resolved
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let (notifier, completion) = watch::channel(());
        (
            Self {
                effects: Arc::clone(&in_flight),
                completion,
            },
            EffectTracking {
                counter: in_flight,
                notifier: Arc::new(notifier),
            },
        )
    }

    /// A handle with nothing to wait for
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of effects of this action still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Resolve once every effect of the action has finished
    ///
    /// Never times out: an effect waiting on user input keeps this pending
    /// for as long as the user does not answer.
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // every tracking clone is gone, nothing can still be running
                break;
            }
        }
    }

    /// [`EffectHandle::wait`] bounded by `timeout`
    ///
    /// # Errors
    ///
    /// `Err(())` when effects are still running after `timeout`.
    #[allow(clippy::result_unit_err)]
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Per-action counter shared by the handle and the spawned effects
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    /// An effect started
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// An effect finished; the last one wakes the handle
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Marks an effect finished when its task ends, panicking or not
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Store-wide in-flight counter, released on drop
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The store runtime
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Effect, EffectHandle,
        EffectTracking, Ordering, Reducer, RwLock, StoreConfig, StoreError,
    };
    use tokio::sync::watch;

    /// Owns one piece of state and runs every action through its reducer
    ///
    /// The state sits behind an `RwLock` and only the reducer writes it.
    /// Effects run on tokio tasks and any action they yield is sent back in.
    /// Observers wait on a change counter bumped after each reduction.
    ///
    /// Cloning a Store is cheap; clones share the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        changes: Arc<watch::Sender<u64>>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Store with the default [`StoreConfig`]
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Store with explicit tunables
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (changes, _) = watch::channel(0);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                config,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                changes: Arc::new(changes),
            }
        }

        /// Number of effects currently running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// [`Store::shutdown`] with the configured deadline
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.config.shutdown_timeout).await
        }

        /// Stop accepting actions and wait for in-flight effects
        ///
        /// The flag is set first, so effects finishing during the wait have
        /// their feedback actions dropped.
        ///
        /// # Errors
        ///
        /// [`StoreError::ShutdownTimeout`] with the number of effects still
        /// running once `timeout` has passed. A timeout too large to add to
        /// the current instant never expires.
        pub async fn shutdown(&self, timeout: std::time::Duration) -> Result<(), StoreError> {
            tracing::info!("Store shutting down");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let deadline = tokio::time::Instant::now().checked_add(timeout);

            loop {
                let in_flight = self.pending_effects.load(Ordering::Acquire);
                if in_flight == 0 {
                    tracing::info!("Store shut down cleanly");
                    return Ok(());
                }

                if deadline.is_some_and(|deadline| tokio::time::Instant::now() >= deadline) {
                    tracing::warn!(in_flight, "Shutdown deadline passed with effects running");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(in_flight));
                }

                tokio::time::sleep(self.config.shutdown_poll_interval).await;
            }
        }

        /// Reduce `action` under the write lock, bump the change counter and
        /// start the returned effects
        ///
        /// Effects may still be running when `send` returns; use the returned
        /// [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// [`StoreError::ShutdownInProgress`] once shutdown has started.
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            let (handle, ()) = self.send_and_read(action, |_| ()).await?;
            Ok(handle)
        }

        /// Send an action and read the state it produced
        ///
        /// `read` runs under the same write lock as the reducer, before any
        /// effect starts, so no other action can slip in between.
        ///
        /// ```ignore
        /// let (_handle, count) = store
        ///     .send_and_read(TaskAction::AddTask { title }, |s| s.task_count())
        ///     .await?;
        /// ```
        ///
        /// # Errors
        ///
        /// [`StoreError::ShutdownInProgress`] once shutdown has started.
        #[tracing::instrument(skip(self, action, read), name = "store_send")]
        pub async fn send_and_read<F, T>(
            &self,
            action: A,
            read: F,
        ) -> Result<(EffectHandle, T), StoreError>
        where
            R: Clone,
            E: Clone,
            F: FnOnce(&S) -> T,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Action refused during shutdown");
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let (effects, value) = {
                let mut guard = self.state.write().await;
                let effects = self.reducer.reduce(&mut *guard, action, &self.environment);
                self.changes.send_modify(|version| *version += 1);
                (effects, read(&*guard))
            };

            tracing::trace!(effects = effects.len(), "Action reduced");
            for effect in effects {
                self.execute_effect(effect, &tracking);
            }

            Ok((handle, value))
        }

        /// Run `f` against the current state under the read lock
        ///
        /// ```ignore
        /// let count = store.state(|s| s.tasks.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            f(&*self.state.read().await)
        }

        /// Subscribe to state changes
        ///
        /// The receiver holds a counter that increases after every reduced
        /// action; call `changed().await` on it and then read the state.
        #[must_use]
        pub fn subscribe(&self) -> watch::Receiver<u64> {
            self.changes.subscribe()
        }

        /// Start one effect
        ///
        /// A future runs on its own task so a panic stays there; the guards
        /// release both counters either way.
        fn execute_effect(&self, effect: Effect<A>, tracking: &EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let guards = (
                        DecrementGuard(tracking.clone()),
                        AtomicCounterGuard(Arc::clone(&self.pending_effects)),
                    );
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guards = guards;
                        if let Some(action) = fut.await {
                            tracing::trace!("Feeding effect action back");
                            if let Err(error) = store.send(action).await {
                                tracing::debug!(%error, "Dropped feedback action");
                            }
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                config: self.config.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                changes: Arc::clone(&self.changes),
            }
        }
    }
}

pub use store::Store;
