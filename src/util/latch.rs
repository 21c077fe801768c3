//! Optimistic UI values that fall back to the confirmed value.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use super::timer::{Timer, TimerTask};
use crate::disposable::Disposable;

pub const DEFAULT_SEND_DELAY: Duration = Duration::ZERO;
pub const DEFAULT_RESTORE_DELAY: Duration = Duration::from_millis(3000);

/// Keeps the value shown by a control in step with a remote value.
///
/// A user edit is shown immediately ([`ValueLatch::set_ui_value`]), sent
/// after `send_delay`, and reverted to the last confirmed value after
/// `send_delay + restore_delay` unless a confirmation arrives first.
/// Confirmations ([`ValueLatch::set_state_value`]) are shown immediately
/// when no edit is in flight.
///
/// The listener runs synchronously for direct calls and through the timer's
/// dispatcher for delayed ones, so drive a latch from the thread that owns
/// that dispatcher.
pub struct ValueLatch<T> {
    inner: Arc<LatchInner<T>>,
}

struct LatchInner<T> {
    timer: Timer,
    send_delay: Duration,
    restore_delay: Duration,
    sender: Box<dyn Fn(T) + Send + Sync>,
    listener: Box<dyn Fn(T) + Send + Sync>,
    state: Mutex<LatchState<T>>,
}

struct LatchState<T> {
    ui_value: T,
    state_value: T,
    suppressed: bool,
    pending: Vec<TimerTask>,
    disposed: bool,
}

impl<T: Clone + Send + 'static> ValueLatch<T> {
    pub fn new<S, L>(timer: Timer, value: T, sender: S, listener: L) -> Self
    where
        S: Fn(T) + Send + Sync + 'static,
        L: Fn(T) + Send + Sync + 'static,
    {
        Self::with_delays(timer, value, DEFAULT_SEND_DELAY, DEFAULT_RESTORE_DELAY, sender, listener)
    }

    pub fn with_delays<S, L>(
        timer: Timer,
        value: T,
        send_delay: Duration,
        restore_delay: Duration,
        sender: S,
        listener: L,
    ) -> Self
    where
        S: Fn(T) + Send + Sync + 'static,
        L: Fn(T) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(LatchInner {
                timer,
                send_delay,
                restore_delay,
                sender: Box::new(sender),
                listener: Box::new(listener),
                state: Mutex::new(LatchState {
                    ui_value: value.clone(),
                    state_value: value,
                    suppressed: false,
                    pending: Vec::new(),
                    disposed: false,
                }),
            }),
        }
    }

    /// Show `value` now, send it after the send delay and schedule the
    /// restore. Cancels any send or restore still pending.
    pub fn set_ui_value(&self, value: T) {
        let send = {
            let weak = Arc::downgrade(&self.inner);
            let value = value.clone();
            self.inner.timer.after(self.inner.send_delay, move || {
                if let Some(inner) = live(&weak) {
                    (inner.sender)(value);
                }
            })
        };
        let restore = {
            let weak = Arc::downgrade(&self.inner);
            self.inner
                .timer
                .after(self.inner.send_delay + self.inner.restore_delay, move || {
                    if let Some(inner) = live(&weak) {
                        inner.restore();
                    }
                })
        };

        let cancelled = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.ui_value = value.clone();
            state.suppressed = true;
            std::mem::replace(&mut state.pending, vec![send, restore])
        };
        drop(cancelled);
        (self.inner.listener)(value);
    }

    /// Record a confirmed value; show it unless an edit is in flight.
    pub fn set_state_value(&self, value: T) {
        let restore = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.state_value = value;
            !state.suppressed
        };
        if restore {
            self.inner.restore();
        }
    }

    pub fn ui_value(&self) -> T {
        self.inner.state.lock().ui_value.clone()
    }

    pub fn state_value(&self) -> T {
        self.inner.state.lock().state_value.clone()
    }
}

fn live<T>(weak: &Weak<LatchInner<T>>) -> Option<Arc<LatchInner<T>>> {
    let inner = weak.upgrade()?;
    if inner.state.lock().disposed {
        return None;
    }
    Some(inner)
}

impl<T: Clone + Send + 'static> LatchInner<T> {
    fn restore(&self) {
        let value = {
            let mut state = self.state.lock();
            state.suppressed = false;
            state.ui_value = state.state_value.clone();
            state.ui_value.clone()
        };
        (self.listener)(value);
    }
}

impl<T: Clone + Send + 'static> Disposable for ValueLatch<T> {
    fn dispose(&self) {
        let pending = {
            let mut state = self.inner.state.lock();
            state.disposed = true;
            std::mem::take(&mut state.pending)
        };
        drop(pending);
    }

    fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }
}
