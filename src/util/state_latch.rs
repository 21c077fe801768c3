//! Latching remote state behind optimistic local updates.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::suppressor::ValueSuppressor;
use super::throttler::ValueThrottler;
use super::timer::Timer;
use crate::disposable::Disposable;

pub const DEFAULT_RESTORE_DELAY: Duration = Duration::from_millis(3000);
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(250);

type Updater = Box<dyn FnOnce() + Send>;

/// Coordinates sending local changes to a remote source with receiving its
/// state.
///
/// - [`StateLatch::send_state`] runs the given updater, throttled so only the
///   last one per send interval runs, and suppresses incoming state for
///   `send_interval + restore_delay`.
/// - [`StateLatch::set_state`] records incoming state. The listener is called
///   right away unless suppressed, otherwise once suppression ends, so the
///   view settles on the remote value if the change never lands.
pub struct StateLatch<T> {
    throttler: ValueThrottler<Updater>,
    suppressor: ValueSuppressor<T>,
}

impl<T: Clone + Send + 'static> StateLatch<T> {
    pub fn new<F>(timer: Timer, listener: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::with_delays(timer, DEFAULT_RESTORE_DELAY, DEFAULT_SEND_INTERVAL, listener)
    }

    pub fn with_delays<F>(timer: Timer, restore_delay: Duration, send_interval: Duration, listener: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            throttler: ValueThrottler::new(timer.clone(), send_interval, |updater: Updater| updater()),
            suppressor: ValueSuppressor::new(timer, send_interval + restore_delay, listener),
        }
    }

    pub fn set_state(&self, value: T) {
        self.suppressor.set_value(value);
    }

    pub fn state(&self) -> Option<T> {
        self.suppressor.value()
    }

    pub fn send_state<F>(&self, updater: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.suppressor.start_suppression();
        self.throttler.emit_value(Box::new(updater));
    }
}

impl<T: Clone + Send + 'static> Disposable for StateLatch<T> {
    fn dispose(&self) {
        self.throttler.dispose();
        self.suppressor.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.suppressor.is_disposed()
    }
}

/// A [`StateLatch`] per key, created on first use.
pub struct CompositeStateLatch<K, V> {
    timer: Timer,
    restore_delay: Duration,
    send_interval: Duration,
    listener: Arc<dyn Fn(K, V) + Send + Sync>,
    latches: Mutex<Option<HashMap<K, Arc<StateLatch<V>>>>>,
}

impl<K, V> CompositeStateLatch<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    pub fn new<F>(timer: Timer, listener: F) -> Self
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        Self::with_delays(timer, DEFAULT_RESTORE_DELAY, DEFAULT_SEND_INTERVAL, listener)
    }

    pub fn with_delays<F>(timer: Timer, restore_delay: Duration, send_interval: Duration, listener: F) -> Self
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        Self {
            timer,
            restore_delay,
            send_interval,
            listener: Arc::new(listener),
            latches: Mutex::new(Some(HashMap::new())),
        }
    }

    pub fn set_state(&self, key: K, value: V) {
        self.with_latch(key, |latch| latch.set_state(value));
    }

    pub fn state(&self, key: &K) -> Option<V> {
        let latch = self
            .latches
            .lock()
            .as_ref()
            .and_then(|latches| latches.get(key).cloned())?;
        latch.state()
    }

    pub fn send_state<F>(&self, key: K, updater: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.with_latch(key, |latch| latch.send_state(updater));
    }

    /// Dispose and forget latches whose key is not in `active_keys`.
    pub fn remove_inactive(&self, active_keys: &HashSet<K>) {
        let removed: Vec<Arc<StateLatch<V>>> = {
            let mut guard = self.latches.lock();
            let Some(latches) = guard.as_mut() else {
                return;
            };
            let stale: Vec<K> = latches
                .keys()
                .filter(|key| !active_keys.contains(*key))
                .cloned()
                .collect();
            stale.iter().filter_map(|key| latches.remove(key)).collect()
        };
        for latch in removed {
            latch.dispose();
        }
    }

    pub fn len(&self) -> usize {
        self.latches.lock().as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The map lock is released before `f` runs; listeners may call back in.
    fn with_latch(&self, key: K, f: impl FnOnce(&StateLatch<V>)) {
        let latch = {
            let mut guard = self.latches.lock();
            let Some(latches) = guard.as_mut() else {
                return;
            };
            let latch = latches.entry(key.clone()).or_insert_with(|| {
                let listener = Arc::clone(&self.listener);
                Arc::new(StateLatch::with_delays(
                    self.timer.clone(),
                    self.restore_delay,
                    self.send_interval,
                    move |value| listener(key.clone(), value),
                ))
            });
            Arc::clone(latch)
        };
        f(&latch);
    }
}

impl<K, V> Disposable for CompositeStateLatch<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    fn dispose(&self) {
        let latches = self.latches.lock().take();
        for latch in latches.into_iter().flat_map(HashMap::into_values) {
            latch.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.latches.lock().is_none()
    }
}
