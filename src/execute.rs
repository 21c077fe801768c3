//! Turning async sources into [`Async`] state transitions.
//!
//! A source is polled on a tokio runtime. Before it is polled, `Loading` is
//! submitted to the store; each produced value becomes `Success` and the
//! first error becomes `Fail` and ends the operation. Every transition goes
//! through the caller's reducer, so the store's ordering guarantees apply.

use std::future::{poll_fn, Future};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use futures_core::Stream;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::async_state::{Async, AsyncError, Metadata};
use crate::disposable::Disposable;
use crate::mvi::MviState;
use crate::store::StateStore;

/// Maps a raw source value to the value stored in state.
pub type Mapper<T, V> = Box<dyn Fn(T) -> V + Send + Sync + 'static>;

/// Derives success metadata from a raw source value.
pub type MetadataFn<T> = Box<dyn Fn(&T) -> Option<Metadata> + Send + Sync + 'static>;

type AsyncReducer<S, V> = Arc<dyn Fn(&S, Async<V>) -> S + Send + Sync + 'static>;

/// Cancellation handle for a running execution.
///
/// Cancelling stops further state updates from the operation. Updates that
/// were already applied stay applied.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    inner: Arc<ExecutionInner>,
}

#[derive(Debug)]
struct ExecutionInner {
    abort: AbortHandle,
    cancelled: Arc<AtomicBool>,
}

impl ExecutionHandle {
    fn new(abort: AbortHandle, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            inner: Arc::new(ExecutionInner { abort, cancelled }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// The source completed, failed, or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.inner.abort.is_finished()
    }
}

impl Disposable for ExecutionHandle {
    fn dispose(&self) {
        self.cancel();
    }

    /// Finished executions count as disposed so owning composites prune them.
    fn is_disposed(&self) -> bool {
        self.is_cancelled() || self.is_finished()
    }
}

/// Submits `Async` transitions for one execution.
struct Updater<S: MviState, V> {
    store: StateStore<S>,
    reducer: AsyncReducer<S, V>,
    cancelled: Arc<AtomicBool>,
}

impl<S, V> Updater<S, V>
where
    S: MviState,
    V: Clone + Send + Sync + 'static,
{
    /// Queue `value` for the worker. Cancellation is checked again when the
    /// reducer runs, so a cancel that lands while the reducer is still
    /// queued turns it into a no-op.
    fn push(&self, value: Async<V>) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let reducer = Arc::clone(&self.reducer);
        let cancelled = Arc::clone(&self.cancelled);
        // Debug mode runs a reducer twice; both runs must agree.
        let skipped = OnceLock::new();
        self.store.set(move |state| {
            if *skipped.get_or_init(|| cancelled.load(Ordering::SeqCst)) {
                return state.clone();
            }
            reducer(state, value.clone())
        });
    }

    fn success<T>(&self, raw: T, mapper: &Mapper<T, V>, metadata: Option<&MetadataFn<T>>) {
        let metadata = metadata.and_then(|extract| extract(&raw));
        self.push(Async::Success {
            value: mapper(raw),
            metadata,
        });
    }

    fn fail(&self, error: anyhow::Error) {
        tracing::debug!(error = %error, "async source failed");
        self.push(Async::Fail {
            error: AsyncError::new(error),
            value: None,
        });
    }
}

/// Run a one-shot future.
pub(crate) fn spawn_future<S, T, V, E, Fut>(
    runtime: &Handle,
    store: StateStore<S>,
    future: Fut,
    mapper: Mapper<T, V>,
    metadata: Option<MetadataFn<T>>,
    reducer: AsyncReducer<S, V>,
) -> ExecutionHandle
where
    S: MviState,
    T: Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Into<anyhow::Error> + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let updater = Updater {
        store,
        reducer,
        cancelled: Arc::clone(&cancelled),
    };
    updater.push(Async::loading());

    let task = runtime.spawn(async move {
        match future.await {
            Ok(raw) => updater.success(raw, &mapper, metadata.as_ref()),
            Err(error) => updater.fail(error.into()),
        }
    });

    ExecutionHandle::new(task.abort_handle(), cancelled)
}

/// Run a multi-value stream until it ends or yields an error.
pub(crate) fn spawn_stream<S, T, V, E, St>(
    runtime: &Handle,
    store: StateStore<S>,
    stream: St,
    mapper: Mapper<T, V>,
    metadata: Option<MetadataFn<T>>,
    reducer: AsyncReducer<S, V>,
) -> ExecutionHandle
where
    S: MviState,
    T: Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Into<anyhow::Error> + Send + 'static,
    St: Stream<Item = Result<T, E>> + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let updater = Updater {
        store,
        reducer,
        cancelled: Arc::clone(&cancelled),
    };
    updater.push(Async::loading());

    let task = runtime.spawn(async move {
        let mut stream = Box::pin(stream);
        while let Some(item) = poll_fn(|cx| stream.as_mut().poll_next(cx)).await {
            match item {
                Ok(raw) => updater.success(raw, &mapper, metadata.as_ref()),
                Err(error) => {
                    updater.fail(error.into());
                    break;
                }
            }
        }
    });

    ExecutionHandle::new(task.abort_handle(), cancelled)
}
