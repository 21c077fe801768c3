//! Error types for the state store and view model.

use thiserror::Error;

/// Fatal conditions for a single state store instance.
///
/// Once one of these is recorded the worker stops and the store behaves as
/// disposed. Debug-mode checks produce the first three variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A reducer produced different outputs for the same input.
    #[error("Reducer for {state_type} is impure: two applications to the same state produced different results")]
    PurityViolation { state_type: &'static str },

    /// A previously published state changed after publication.
    #[error("State {state_type} was mutated after it was published; states must not share interior mutability")]
    MutatedState { state_type: &'static str },

    /// The state type failed structural validation at construction.
    #[error("State {state_type} failed validation: {reason}")]
    StateShape {
        state_type: &'static str,
        reason: String,
    },

    /// A reducer or read block panicked on the worker thread.
    #[error("State worker panicked: {message}")]
    WorkerPanicked { message: String },

    /// The worker thread could not be started.
    #[error("Failed to spawn state worker: {message}")]
    WorkerSpawn { message: String },
}

/// Errors returned by view model and subscription operations.
#[derive(Debug, Error)]
pub enum MviError {
    /// The lifecycle boundary already reached its terminal state.
    #[error("Cannot observe a lifecycle after it has been destroyed")]
    LifecycleDestroyed,

    /// The view model was cleared.
    #[error("View model has been cleared")]
    Disposed,

    /// No tokio runtime was available to drive an async source.
    #[error("No tokio runtime available to execute async source")]
    NoRuntime,

    /// The underlying store failed.
    #[error("State store failed: {0}")]
    Store(#[from] StoreError),
}

/// Render a panic payload as a message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_handles_str_and_string() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }

    #[test]
    fn store_error_converts_into_mvi_error() {
        let err: MviError = StoreError::PurityViolation { state_type: "Counter" }.into();
        assert!(matches!(err, MviError::Store(StoreError::PurityViolation { .. })));
        assert!(err.to_string().contains("impure"));
    }
}
