//! Serialized state store.
//!
//! A [`StateStore`] owns the current state, a [`MutationQueue`] of pending
//! reads and writes, and one worker thread that drains the queue. Callers on
//! any thread only enqueue; every reducer and read block runs on the worker,
//! so all mutations of one store observe a single total order.
//!
//! Flush algorithm (per wake-up of the worker):
//!
//! 1. Take *all* pending writes, fold them over the current state in
//!    submission order and publish the result once.
//! 2. Take *one* pending read and run it with the current state.
//! 3. Repeat until both buffers are empty.

mod checker;
mod queue;
mod stream;
mod worker;

use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::config::StoreConfig;
use crate::disposable::Subscription;
use crate::error::StoreError;
use crate::mvi::MviState;

pub use queue::{MutationQueue, ReadBlock, WriteReducer};
pub use stream::{Listener, StateStream};

use worker::{Command, Shared};

/// Construction options for a [`StateStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Double-apply reducers, check for mutated states and validate the
    /// state type. Significantly slower; meant for development builds.
    pub debug_mode: bool,
    /// Name given to the worker thread.
    pub worker_name: String,
    /// In debug mode, also validate the initial state on a background thread.
    pub validate_state_shape: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            debug_mode: false,
            worker_name: "state-worker".to_string(),
            validate_state_shape: true,
        }
    }
}

impl StoreOptions {
    pub fn debug() -> Self {
        Self {
            debug_mode: true,
            ..Self::default()
        }
    }
}

impl From<&StoreConfig> for StoreOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            debug_mode: config.debug_mode,
            worker_name: config.worker_thread_name.clone(),
            validate_state_shape: config.validate_state_shape,
        }
    }
}

/// Thread-safe handle to a serialized state container.
///
/// Cheap to clone; all clones share one state and one worker. The worker
/// stops when the store is disposed, fails, or the last handle is dropped.
pub struct StateStore<S: MviState> {
    inner: Arc<StoreInner<S>>,
}

struct StoreInner<S: MviState> {
    shared: Arc<Shared<S>>,
    tx: Mutex<Option<Sender<Command>>>,
    options: StoreOptions,
}

impl<S: MviState> Clone for StateStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: MviState> StateStore<S> {
    pub fn new(initial: S) -> Self {
        Self::with_options(initial, StoreOptions::default())
    }

    /// Create a store and start its worker thread.
    ///
    /// If the thread cannot be spawned the store is returned already failed
    /// with [`StoreError::WorkerSpawn`].
    pub fn with_options(initial: S, options: StoreOptions) -> Self {
        let shared = Arc::new(Shared::new(initial.clone(), options.debug_mode));
        let (tx, rx) = mpsc::channel();

        shared.running.store(true, Ordering::SeqCst);
        if let Err(err) = worker::spawn(&options.worker_name, Arc::clone(&shared), rx) {
            shared.running.store(false, Ordering::SeqCst);
            shared.record_failure(StoreError::WorkerSpawn {
                message: err.to_string(),
            });
        }

        if options.debug_mode && options.validate_state_shape {
            spawn_shape_validation(&options.worker_name, initial, tx.clone());
        }

        tracing::debug!(
            worker = %options.worker_name,
            debug_mode = options.debug_mode,
            "state store created"
        );

        Self {
            inner: Arc::new(StoreInner {
                shared,
                tx: Mutex::new(Some(tx)),
                options,
            }),
        }
    }

    /// Snapshot of the latest published state.
    ///
    /// Does not wait for pending writes; use [`StateStore::get`] for a read
    /// ordered after them.
    pub fn state(&self) -> S {
        self.inner.shared.stream.value()
    }

    /// Run `block` on the worker with the state produced by every write
    /// enqueued before this call. Returns immediately.
    pub fn get<F>(&self, block: F)
    where
        F: FnOnce(&S) + Send + 'static,
    {
        if self.is_disposed() {
            tracing::warn!("get on a disposed state store ignored");
            return;
        }
        self.inner.shared.queue.enqueue_read(Box::new(block));
        self.schedule();
    }

    /// Enqueue a reducer. Returns immediately; it runs on the worker.
    ///
    /// Reducers submitted from inside a read block are applied before the
    /// next read runs.
    pub fn set<F>(&self, reducer: F)
    where
        F: Fn(&S) -> S + Send + 'static,
    {
        if self.is_disposed() {
            tracing::warn!("set on a disposed state store ignored");
            return;
        }
        self.inner.shared.queue.enqueue_write(Box::new(reducer));
        self.schedule();
    }

    /// Listen to distinct states, starting with the current one.
    ///
    /// The listener runs on the worker thread (or the subscribing thread for
    /// the replayed value) and must not block.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.inner.shared.stream.subscribe(listener)
    }

    pub fn stream(&self) -> StateStream<S> {
        self.inner.shared.stream.clone()
    }

    /// Stop the worker and drop everything still queued. Idempotent.
    ///
    /// Does not wait for the worker; a flush already running completes.
    pub fn dispose(&self) {
        if self.inner.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shared.queue.clear();
        self.inner.shutdown();
        tracing::debug!(worker = %self.inner.options.worker_name, "state store disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.shared.disposed.load(Ordering::SeqCst)
    }

    /// The error that stopped the store, if any.
    pub fn failure(&self) -> Option<StoreError> {
        self.inner.shared.failure.lock().clone()
    }

    /// Whether the worker thread is still alive.
    pub fn is_worker_running(&self) -> bool {
        self.inner.shared.running.load(Ordering::SeqCst)
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    fn schedule(&self) {
        let tx = self.inner.tx.lock();
        if let Some(tx) = tx.as_ref() {
            if tx.send(Command::Flush).is_err() {
                tracing::trace!("state worker gone; flush request dropped");
            }
        }
    }
}

impl<S: MviState> StoreInner<S> {
    fn shutdown(&self) {
        if let Some(tx) = self.tx.lock().take() {
            let _ = tx.send(Command::Shutdown);
        }
    }
}

impl<S: MviState> Drop for StoreInner<S> {
    fn drop(&mut self) {
        self.shared.disposed.store(true, Ordering::SeqCst);
        self.shutdown();
    }
}

fn spawn_shape_validation<S: MviState>(worker_name: &str, initial: S, tx: Sender<Command>) {
    let spawned = thread::Builder::new()
        .name(format!("{worker_name}-validate"))
        .spawn(move || {
            if let Err(error) = checker::validate_shape(&initial) {
                let _ = tx.send(Command::Fail(error));
            }
        });
    if let Err(err) = spawned {
        tracing::warn!(error = %err, "could not start state validation thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Count(i32);
    impl MviState for Count {}

    fn read(store: &StateStore<Count>) -> Count {
        let (tx, rx) = mpsc::channel();
        store.get(move |s| {
            let _ = tx.send(s.clone());
        });
        rx.recv_timeout(Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn get_sees_prior_set() {
        let store = StateStore::new(Count(0));
        store.set(|s| Count(s.0 + 1));
        store.set(|s| Count(s.0 * 10));
        assert_eq!(read(&store), Count(10));
        assert_eq!(store.state(), Count(10));
    }

    #[test]
    fn worker_thread_uses_configured_name() {
        let options = StoreOptions {
            worker_name: "counter-worker".to_string(),
            ..StoreOptions::default()
        };
        let store = StateStore::with_options(Count(0), options);
        let (tx, rx) = mpsc::channel();
        store.get(move |_| {
            let _ = tx.send(thread::current().name().map(str::to_string));
        });
        let name = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(name.as_deref(), Some("counter-worker"));
    }

    #[test]
    fn dispose_is_idempotent_and_stops_queueing() {
        let store = StateStore::new(Count(0));
        store.dispose();
        store.dispose();
        assert!(store.is_disposed());

        store.set(|s| Count(s.0 + 1));
        assert_eq!(store.state(), Count(0));
        assert!(store.failure().is_none());
    }

    #[test]
    fn options_follow_store_config() {
        let config = StoreConfig {
            debug_mode: true,
            worker_thread_name: "w".to_string(),
            validate_state_shape: false,
        };
        let options = StoreOptions::from(&config);
        assert!(options.debug_mode);
        assert_eq!(options.worker_name, "w");
        assert!(!options.validate_state_shape);
    }
}
