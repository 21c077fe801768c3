//! Replay-latest multicast stream of state snapshots.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::disposable::{Disposable, Subscription};

/// Callback receiving each distinct value.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A multicast stream that remembers its latest value.
///
/// - New listeners immediately receive the latest value, then every later one.
/// - A published value equal to the latest one is dropped.
/// - Emission and replay are serialized, so a listener never observes values
///   out of order or misses one published while it was subscribing.
pub struct StateStream<T> {
    inner: Arc<StreamInner<T>>,
}

struct StreamInner<T> {
    latest: RwLock<T>,
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
    next_id: AtomicU64,
    // Re-entrant so a listener may subscribe from inside a delivery.
    emit: ReentrantMutex<()>,
}

impl<T> Clone for StateStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> StateStream<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                latest: RwLock::new(initial),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                emit: ReentrantMutex::new(()),
            }),
        }
    }

    /// Snapshot of the latest value.
    pub fn value(&self) -> T {
        self.inner.latest.read().clone()
    }

    /// Publish `value` to every listener unless it equals the latest value.
    ///
    /// Returns whether the value was emitted.
    pub fn publish(&self, value: T) -> bool {
        let _emit = self.inner.emit.lock();
        {
            let mut latest = self.inner.latest.write();
            if *latest == value {
                return false;
            }
            *latest = value.clone();
        }
        let listeners: Vec<Listener<T>> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&value);
        }
        true
    }

    /// Register `listener`, replaying the latest value to it first.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(listener);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let _emit = self.inner.emit.lock();
        self.inner
            .listeners
            .lock()
            .push((id, Arc::clone(&listener)));
        let latest = self.value();
        listener(&latest);

        Subscription::new(StreamSubscription {
            stream: Arc::downgrade(&self.inner),
            id,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

struct StreamSubscription<T> {
    stream: Weak<StreamInner<T>>,
    id: u64,
    disposed: AtomicBool,
}

impl<T: Send + Sync> Disposable for StreamSubscription<T> {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(stream) = self.stream.upgrade() {
            // Drop the removed listener after releasing the lock.
            let removed = {
                let mut listeners = stream.listeners.lock();
                listeners
                    .iter()
                    .position(|(id, _)| *id == self.id)
                    .map(|index| listeners.remove(index))
            };
            drop(removed);
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
