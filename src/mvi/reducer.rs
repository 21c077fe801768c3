//! Reducer trait for MVI architecture.

use super::intent::Intent;
use super::state::MviState;

/// Reducer transforms state based on intents.
///
/// The reducer is the only place where state transitions happen.
/// It must be a pure function: (State, Intent) -> State. In debug mode the
/// store applies it twice to the same input and rejects differing outputs.
pub trait Reducer {
    /// The state type this reducer operates on.
    type State: MviState;

    /// The intent type this reducer handles.
    type Intent: Intent;

    /// Process an intent and return the new state.
    ///
    /// This should be a pure function with no side effects.
    fn reduce(state: &Self::State, intent: &Self::Intent) -> Self::State;
}
