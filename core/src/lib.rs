//! # Task List Core
//!
//! Core traits and types for the task list store.
//!
//! The store follows the reducer pattern: every change to the task collection
//! is expressed as an action, applied by a pure reducer, and any interaction
//! with the outside world is returned as an [`effect::Effect`] description
//! instead of being performed inline.
//!
//! ## Vocabulary
//!
//! A store owns a *state* and accepts *actions*, which are user commands or
//! answers fed back from effects. A [`reducer::Reducer`] folds one action into
//! the state and returns [`effect::Effect`] values for the runtime to run.
//! Clocks, id sources and prompters reach the reducer through its
//! *environment*.
//!
//! ## Example
//!
//! ```
//! use tasklist_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
//!
//! #[derive(Default)]
//! struct Tally {
//!     count: usize,
//! }
//!
//! enum TallyAction {
//!     Bump,
//! }
//!
//! struct TallyReducer;
//!
//! impl Reducer for TallyReducer {
//!     type State = Tally;
//!     type Action = TallyAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut Tally,
//!         action: TallyAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<TallyAction>; 4]> {
//!         match action {
//!             TallyAction::Bump => state.count += 1,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = Tally::default();
//! TallyReducer.reduce(&mut state, TallyAction::Bump, &());
//! assert_eq!(state.count, 1);
//! ```

pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Clock, id and prompt seams injected into reducers
pub mod environment;

/// State transitions
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Applies actions to a state
    ///
    /// Given the same state, action and environment answers, a reducer makes
    /// the same change and returns the same effects.
    pub trait Reducer {
        /// Data the reducer mutates
        type State;

        /// Inputs the reducer accepts
        type Action;

        /// Dependencies the reducer may consult
        type Environment;

        /// Validate `action`, update `state` in place and describe the
        /// follow-up work
        ///
        /// Most reducers return one or two effects, so the effects are kept
        /// inline in a `SmallVec` to avoid a heap allocation per action.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Deferred work returned by reducers
///
/// Effects are values returned by reducers and executed by the store runtime.
/// A reducer never awaits anything itself: showing an alert or waiting for the
/// user to answer a confirmation happens inside an effect, and whatever the
/// effect learns is fed back to the reducer as a new action.
pub mod effect {
    use futures::future::BoxFuture;
    use std::future::Future;

    /// Something the runtime should do after a reduction
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Async work; a `Some` result goes back through the reducer
        Future(BoxFuture<'static, Option<Action>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => f.write_str("Effect::None"),
                Self::Future(_) => f.write_str("Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async computation into an effect
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Whether this effect does nothing
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}
