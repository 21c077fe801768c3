//! Base trait for state held by a state store.

use std::fmt::Debug;

/// Marker trait for state objects.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Self-contained (all data needed to render the view)
/// - Comparable (PartialEq for detecting changes)
/// - Printable (Debug is used by the debug-mode mutation checker and state logging)
///
/// `Sync` is required because the latest snapshot is shared between the
/// worker thread and synchronous readers.
pub trait MviState: Clone + PartialEq + Debug + Send + Sync + 'static {}
