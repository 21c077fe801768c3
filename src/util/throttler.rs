//! Throttle-last emission of values.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use super::timer::{Timer, TimerTask};
use crate::disposable::Disposable;

pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(250);

/// Emits at most one value per interval: the last one received in it.
///
/// The first value opens a window; when the window closes the most recent
/// value is delivered to the listener through the timer's dispatcher. Safe to
/// call from multiple threads.
pub struct ValueThrottler<T> {
    inner: Arc<ThrottlerInner<T>>,
}

struct ThrottlerInner<T> {
    timer: Timer,
    interval: Duration,
    listener: Box<dyn Fn(T) + Send + Sync>,
    state: Mutex<ThrottlerState<T>>,
}

struct ThrottlerState<T> {
    pending: Option<T>,
    window: Option<TimerTask>,
    disposed: bool,
}

impl<T: Send + 'static> ValueThrottler<T> {
    pub fn new<F>(timer: Timer, interval: Duration, listener: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ThrottlerInner {
                timer,
                interval,
                listener: Box::new(listener),
                state: Mutex::new(ThrottlerState {
                    pending: None,
                    window: None,
                    disposed: false,
                }),
            }),
        }
    }

    pub fn emit_value(&self, value: T) {
        let mut state = self.inner.state.lock();
        if state.disposed {
            return;
        }
        state.pending = Some(value);
        if state.window.is_none() {
            let weak = Arc::downgrade(&self.inner);
            state.window = Some(self.inner.timer.after(self.inner.interval, move || {
                close_window(&weak);
            }));
        }
    }
}

fn close_window<T>(weak: &Weak<ThrottlerInner<T>>) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let value = {
        let mut state = inner.state.lock();
        if state.disposed {
            return;
        }
        state.window = None;
        state.pending.take()
    };
    if let Some(value) = value {
        (inner.listener)(value);
    }
}

impl<T: Send + 'static> Disposable for ValueThrottler<T> {
    fn dispose(&self) {
        let window = {
            let mut state = self.inner.state.lock();
            state.disposed = true;
            state.pending = None;
            state.window.take()
        };
        drop(window);
    }

    fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }
}
