//! Disposable resources and subscription handles.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// A resource that can be released exactly once.
///
/// `dispose` must be idempotent and safe to call from any thread, including
/// from inside a callback owned by the resource itself.
pub trait Disposable: Send + Sync {
    fn dispose(&self);
    fn is_disposed(&self) -> bool;
}

/// Cloneable handle to a disposable resource.
///
/// Returned by every subscribe call. Dropping the handle does *not* dispose
/// the subscription; the owning view model disposes it on clear.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<dyn Disposable>,
}

impl Subscription {
    pub fn new<D: Disposable + 'static>(disposable: D) -> Self {
        Self {
            inner: Arc::new(disposable),
        }
    }

    pub fn from_arc(inner: Arc<dyn Disposable>) -> Self {
        Self { inner }
    }

    /// A subscription that runs `action` once when disposed.
    pub fn from_fn<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(ActionDisposable {
            action: Mutex::new(Some(Box::new(action))),
        })
    }

    /// A handle that is already disposed.
    pub fn disposed() -> Self {
        Self::new(ActionDisposable {
            action: Mutex::new(None),
        })
    }
}

impl Disposable for Subscription {
    fn dispose(&self) {
        self.inner.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

type Action = Box<dyn FnOnce() + Send>;

struct ActionDisposable {
    action: Mutex<Option<Action>>,
}

impl Disposable for ActionDisposable {
    fn dispose(&self) {
        // Take outside the call so a re-entrant dispose sees `None`.
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    fn is_disposed(&self) -> bool {
        self.action.lock().is_none()
    }
}

/// A set of disposables released together.
///
/// Once disposed, anything added afterwards is disposed immediately.
pub struct CompositeDisposable {
    // `None` once the composite itself has been disposed.
    entries: Mutex<Option<Vec<Subscription>>>,
}

impl CompositeDisposable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Some(Vec::new())),
        }
    }

    /// Track `subscription`, returning it for chaining.
    pub fn add(&self, subscription: Subscription) -> Subscription {
        let rejected = {
            let mut entries = self.entries.lock();
            match entries.as_mut() {
                Some(list) => {
                    list.retain(|entry| !entry.is_disposed());
                    list.push(subscription.clone());
                    false
                }
                None => true,
            }
        };
        if rejected {
            subscription.dispose();
        }
        subscription
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .as_ref()
            .map(|list| list.iter().filter(|entry| !entry.is_disposed()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every tracked entry but keep accepting new ones.
    pub fn clear(&self) {
        let drained = self
            .entries
            .lock()
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default();
        for entry in drained {
            entry.dispose();
        }
    }
}

impl Default for CompositeDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for CompositeDisposable {
    fn dispose(&self) {
        let drained = self.entries.lock().take().unwrap_or_default();
        for entry in drained {
            entry.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.entries.lock().is_none()
    }
}
