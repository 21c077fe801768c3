//! Repeated emission of a value, e.g. while a button is held.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::timer::{Timer, TimerTask};
use crate::disposable::Disposable;

pub const DEFAULT_REPEAT_INTERVAL: Duration = Duration::from_millis(250);

/// Calls the listener with a value and a running count until stopped.
pub struct ValueRepeater<T> {
    timer: Timer,
    initial_delay: Duration,
    interval: Duration,
    listener: Arc<dyn Fn(T, u64) + Send + Sync>,
    state: Mutex<RepeaterState>,
}

#[derive(Default)]
struct RepeaterState {
    emissions: Option<TimerTask>,
    disposed: bool,
}

impl<T: Clone + Send + Sync + 'static> ValueRepeater<T> {
    pub fn new<F>(timer: Timer, listener: F) -> Self
    where
        F: Fn(T, u64) + Send + Sync + 'static,
    {
        Self::with_timing(timer, Duration::ZERO, DEFAULT_REPEAT_INTERVAL, listener)
    }

    pub fn with_timing<F>(timer: Timer, initial_delay: Duration, interval: Duration, listener: F) -> Self
    where
        F: Fn(T, u64) + Send + Sync + 'static,
    {
        Self {
            timer,
            initial_delay,
            interval,
            listener: Arc::new(listener),
            state: Mutex::new(RepeaterState::default()),
        }
    }

    /// Start emitting `value`, replacing any emission in progress.
    pub fn start_emissions(&self, value: T) {
        let listener = Arc::clone(&self.listener);
        let task = self
            .timer
            .every(self.initial_delay, self.interval, move |count| listener(value.clone(), count));
        let previous = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.emissions.replace(task)
        };
        drop(previous);
    }

    pub fn stop_emissions(&self) {
        let emissions = self.state.lock().emissions.take();
        drop(emissions);
    }

    pub fn is_emitting(&self) -> bool {
        self.state.lock().emissions.is_some()
    }
}

impl<T: Clone + Send + Sync + 'static> Disposable for ValueRepeater<T> {
    fn dispose(&self) {
        let emissions = {
            let mut state = self.state.lock();
            state.disposed = true;
            state.emissions.take()
        };
        drop(emissions);
    }

    fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }
}
