//! Delayed and periodic work on tokio time, delivered through a dispatcher.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::dispatch::{immediate, Dispatcher};

/// Schedules callbacks on a tokio runtime and hands them to a dispatcher
/// when they fire.
#[derive(Clone)]
pub struct Timer {
    runtime: Handle,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Timer {
    pub fn new(runtime: Handle, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            runtime,
            dispatcher,
        }
    }

    /// Timer on the current runtime with inline delivery.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current(), immediate())
    }

    /// Run `task` once after `delay`.
    pub fn after<F>(&self, delay: Duration, task: F) -> TimerTask
    where
        F: FnOnce() + Send + 'static,
    {
        let dispatcher = Arc::clone(&self.dispatcher);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            dispatcher.dispatch(Box::new(task));
        });
        TimerTask(handle.abort_handle())
    }

    /// Run `task` after `initial_delay`, then every `period`, passing the
    /// zero-based tick count.
    pub fn every<F>(&self, initial_delay: Duration, period: Duration, task: F) -> TimerTask
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        let dispatcher = Arc::clone(&self.dispatcher);
        let task = Arc::new(task);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(initial_delay).await;
            let mut ticker = tokio::time::interval(period);
            let mut count = 0u64;
            loop {
                ticker.tick().await;
                let task = Arc::clone(&task);
                dispatcher.dispatch(Box::new(move || task(count)));
                count += 1;
            }
        });
        TimerTask(handle.abort_handle())
    }

    /// Hand `task` to the dispatcher right away.
    pub fn dispatch<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatcher.dispatch(Box::new(task));
    }
}

/// A scheduled callback. Cancelled when dropped.
#[derive(Debug)]
pub struct TimerTask(AbortHandle);

impl TimerTask {
    pub fn cancel(&self) {
        self.0.abort();
    }
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}
