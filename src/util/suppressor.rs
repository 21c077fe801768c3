//! Temporarily hold back value notifications.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use super::timer::{Timer, TimerTask};
use crate::disposable::Disposable;

pub const DEFAULT_SUPPRESSION_DELAY: Duration = Duration::from_millis(3000);

/// Holds the latest value and notifies a listener with it, except while
/// suppressed.
///
/// [`ValueSuppressor::start_suppression`] suppresses notifications for the
/// configured delay (restarting the delay on each call). When suppression
/// ends the listener receives the latest value, if any. Notifications always
/// go through the timer's dispatcher.
pub struct ValueSuppressor<T> {
    inner: Arc<SuppressorInner<T>>,
}

struct SuppressorInner<T> {
    timer: Timer,
    delay: Duration,
    listener: Arc<dyn Fn(T) + Send + Sync>,
    state: Mutex<SuppressorState<T>>,
}

struct SuppressorState<T> {
    value: Option<T>,
    suppressed: bool,
    expiry: Option<TimerTask>,
    disposed: bool,
}

impl<T: Clone + Send + 'static> ValueSuppressor<T> {
    pub fn new<F>(timer: Timer, delay: Duration, listener: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(SuppressorInner {
                timer,
                delay,
                listener: Arc::new(listener),
                state: Mutex::new(SuppressorState {
                    value: None,
                    suppressed: false,
                    expiry: None,
                    disposed: false,
                }),
            }),
        }
    }

    /// Suppress notifications until the delay expires. Restarts the delay.
    pub fn start_suppression(&self) {
        let weak = Arc::downgrade(&self.inner);
        let expiry = self.inner.timer.after(self.inner.delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.stop();
            }
        });
        let previous = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.suppressed = true;
            state.expiry.replace(expiry)
        };
        drop(previous);
    }

    /// End suppression now and notify with the latest value, if any.
    pub fn stop_suppression(&self) {
        self.inner.stop();
    }

    /// Record `value`; notify right away unless suppressed.
    pub fn set_value(&self, value: T) {
        let notify = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.value = Some(value);
            !state.suppressed
        };
        if notify {
            self.inner.notify();
        }
    }

    pub fn value(&self) -> Option<T> {
        self.inner.state.lock().value.clone()
    }

    pub fn is_suppressed(&self) -> bool {
        self.inner.state.lock().suppressed
    }
}

impl<T: Clone + Send + 'static> SuppressorInner<T> {
    fn stop(self: &Arc<Self>) {
        let expiry = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.suppressed = false;
            state.expiry.take()
        };
        drop(expiry);
        self.notify();
    }

    fn notify(self: &Arc<Self>) {
        let Some(value) = self.state.lock().value.clone() else {
            return;
        };
        let weak: Weak<Self> = Arc::downgrade(self);
        self.timer.dispatch(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.state.lock().disposed {
                return;
            }
            (inner.listener)(value);
        });
    }
}

impl<T: Clone + Send + 'static> Disposable for ValueSuppressor<T> {
    fn dispose(&self) {
        let expiry = {
            let mut state = self.inner.state.lock();
            state.disposed = true;
            state.expiry.take()
        };
        drop(expiry);
    }

    fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }
}
