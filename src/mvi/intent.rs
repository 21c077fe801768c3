//! Base trait for intents (user/system actions) in MVI architecture.

/// Marker trait for intent objects.
///
/// Intents represent:
/// - User actions (button clicks, key presses)
/// - System events (API responses, timers)
/// - Navigation events
///
/// Intents are processed by reducers to produce new states. They are shared
/// with the worker thread and may be applied twice in debug mode, so they are
/// borrowed by reducers rather than consumed.
pub trait Intent: Send + Sync + 'static {}
