//! Delivery contexts for subscriber callbacks.
//!
//! State is produced on the store's worker thread, but views usually want
//! callbacks on their own thread. A [`Dispatcher`] decides where a delivery
//! runs: inline ([`ImmediateDispatcher`]) or queued for a UI thread that
//! drains a [`MainLoop`].

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

/// A unit of work handed to a dispatcher.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Executes delivery tasks in some execution context.
///
/// Implementations must run tasks in submission order.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, task: Task);
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateDispatcher;

impl Dispatcher for ImmediateDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// Shared handle to the inline dispatcher.
pub fn immediate() -> Arc<dyn Dispatcher> {
    Arc::new(ImmediateDispatcher)
}

/// Queue of tasks owned by a single (UI) thread.
///
/// Other threads submit through [`MainDispatcher`]; the owning thread runs
/// them with [`MainLoop::run_pending`] or [`MainLoop::run_for`].
pub struct MainLoop {
    rx: Receiver<Task>,
    tx: Sender<Task>,
}

impl MainLoop {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { rx, tx }
    }

    /// A dispatcher that posts onto this loop.
    pub fn dispatcher(&self) -> MainDispatcher {
        MainDispatcher {
            tx: self.tx.clone(),
        }
    }

    /// Run every task queued so far without blocking. Returns the count run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for the first task, then drain the queue.
    pub fn run_for(&self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                1 + self.run_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Posts tasks onto a [`MainLoop`].
#[derive(Clone)]
pub struct MainDispatcher {
    tx: Sender<Task>,
}

impl Dispatcher for MainDispatcher {
    fn dispatch(&self, task: Task) {
        if self.tx.send(task).is_err() {
            tracing::trace!("main loop gone; dropping delivery");
        }
    }
}
