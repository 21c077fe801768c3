//! Component lifecycles and lifecycle-gated delivery.
//!
//! A [`Lifecycle`] is owned by a UI component (a screen, a panel) and moves
//! through ordered [`LifecycleState`]s. Subscriptions bound to it deliver
//! only while it is active and tear themselves down once it is destroyed.

mod observer;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use crate::error::MviError;

pub use observer::{DeliveryPolicy, LifecycleAwareObserver};

/// Ordered lifecycle states.
///
/// `Destroyed` sorts lowest so that "at least `Started`" never includes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Destroyed,
    Initialized,
    Created,
    Started,
    Resumed,
}

impl LifecycleState {
    pub fn is_at_least(self, other: LifecycleState) -> bool {
        self >= other
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Destroyed => "destroyed",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Created => "created",
            LifecycleState::Started => "started",
            LifecycleState::Resumed => "resumed",
        };
        f.write_str(name)
    }
}

/// Receives lifecycle transitions.
pub trait LifecycleObserver: Send + Sync {
    fn on_state_changed(&self, state: LifecycleState);
}

/// Registration handle returned by [`Lifecycle::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverKey(u64);

/// A lifecycle boundary with observer notification.
///
/// Cloning yields another handle to the same lifecycle. Observers are
/// notified synchronously on the thread calling [`Lifecycle::move_to`], in
/// registration order, and are released once the lifecycle is destroyed.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}

struct LifecycleInner {
    state: Mutex<LifecycleState>,
    observers: Mutex<Vec<(ObserverKey, Arc<dyn LifecycleObserver>)>>,
    next_key: AtomicU64,
    // Serializes transitions and registrations so each observer sees states in order.
    transition: ReentrantMutex<()>,
}

impl Lifecycle {
    /// A new lifecycle in [`LifecycleState::Initialized`].
    pub fn new() -> Self {
        Self::with_state(LifecycleState::Initialized)
    }

    pub fn with_state(state: LifecycleState) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                state: Mutex::new(state),
                observers: Mutex::new(Vec::new()),
                next_key: AtomicU64::new(1),
                transition: ReentrantMutex::new(()),
            }),
        }
    }

    pub fn current_state(&self) -> LifecycleState {
        *self.inner.state.lock()
    }

    pub fn is_destroyed(&self) -> bool {
        self.current_state() == LifecycleState::Destroyed
    }

    /// Move to `state` and notify observers.
    ///
    /// Same-state moves are ignored. `Destroyed` is terminal: later moves are
    /// ignored and all observers are released after being notified.
    pub fn move_to(&self, state: LifecycleState) {
        let _transition = self.inner.transition.lock();
        {
            let mut current = self.inner.state.lock();
            if *current == state {
                return;
            }
            if *current == LifecycleState::Destroyed {
                tracing::warn!(to = %state, "ignoring transition of a destroyed lifecycle");
                return;
            }
            tracing::trace!(from = %*current, to = %state, "lifecycle transition");
            *current = state;
        }

        for observer in self.snapshot() {
            observer.on_state_changed(state);
        }

        if state == LifecycleState::Destroyed {
            let released = std::mem::take(&mut *self.inner.observers.lock());
            drop(released);
        }
    }

    /// Register `observer` and immediately notify it of the current state.
    ///
    /// Fails with [`MviError::LifecycleDestroyed`] if the lifecycle has
    /// already been destroyed.
    pub fn add_observer(
        &self,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Result<ObserverKey, MviError> {
        let _transition = self.inner.transition.lock();
        let state = self.current_state();
        if state == LifecycleState::Destroyed {
            return Err(MviError::LifecycleDestroyed);
        }
        let key = ObserverKey(self.inner.next_key.fetch_add(1, Ordering::Relaxed));
        self.inner
            .observers
            .lock()
            .push((key, Arc::clone(&observer)));
        observer.on_state_changed(state);
        Ok(key)
    }

    pub fn remove_observer(&self, key: ObserverKey) {
        self.inner.remove(key);
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    /// A non-owning handle.
    pub fn downgrade(&self) -> WeakLifecycle {
        WeakLifecycle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn LifecycleObserver>> {
        self.inner
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.current_state())
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl LifecycleInner {
    fn remove(&self, key: ObserverKey) {
        let removed = {
            let mut observers = self.observers.lock();
            observers
                .iter()
                .position(|(candidate, _)| *candidate == key)
                .map(|index| observers.remove(index))
        };
        drop(removed);
    }
}

/// Weak reference to a [`Lifecycle`] held by observers.
#[derive(Clone, Default)]
pub struct WeakLifecycle {
    inner: Weak<LifecycleInner>,
}

impl WeakLifecycle {
    pub fn upgrade(&self) -> Option<Lifecycle> {
        self.inner.upgrade().map(|inner| Lifecycle { inner })
    }

    /// Remove an observer if the lifecycle is still alive.
    pub fn remove_observer(&self, key: ObserverKey) {
        if let Some(inner) = self.inner.upgrade() {
            inner.remove(key);
        }
    }
}

impl fmt::Debug for WeakLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakLifecycle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
