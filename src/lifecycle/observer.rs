//! Observer that gates delivery on a lifecycle.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::{Lifecycle, LifecycleObserver, LifecycleState, ObserverKey, WeakLifecycle};
use crate::disposable::{Disposable, Subscription};
use crate::error::MviError;

/// What an observer delivers when its lifecycle becomes active again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Only a value that arrived while locked, if any.
    #[default]
    LastUndelivered,
    /// The most recent value, even if it was already delivered.
    LastValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Locked,
    Unlocked,
    Disposed,
}

type Subscriber<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Wraps a subscriber callback and delivers values only while the bound
/// lifecycle is at least the active state (default `Started`).
///
/// - Starts locked. Values arriving while locked overwrite a one-slot buffer.
/// - Unlocking delivers the buffered value once, per [`DeliveryPolicy`].
/// - `Destroyed` disposes the observer: it detaches from the lifecycle,
///   disposes its upstream subscription and drops the subscriber.
///
/// The subscriber runs with no lock held, one value at a time. A value
/// offered while another thread is delivering is handed to that thread,
/// which delivers it next. Once `dispose` returns no new delivery starts, and
/// a subscriber may dispose its own observer from inside the callback.
pub struct LifecycleAwareObserver<T> {
    policy: DeliveryPolicy,
    active_state: LifecycleState,
    inner: Mutex<ObserverState<T>>,
}

struct ObserverState<T> {
    phase: Phase,
    delivering: bool,
    last_value: Option<T>,
    last_undelivered: Option<T>,
    subscriber: Option<Subscriber<T>>,
    upstream: Option<Subscription>,
    lifecycle: WeakLifecycle,
    key: Option<ObserverKey>,
}

impl<T: Clone + Send + 'static> LifecycleAwareObserver<T> {
    pub fn new<F>(policy: DeliveryPolicy, subscriber: F) -> Arc<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::with_active_state(policy, LifecycleState::Started, subscriber)
    }

    pub fn with_active_state<F>(
        policy: DeliveryPolicy,
        active_state: LifecycleState,
        subscriber: F,
    ) -> Arc<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Arc::new(Self {
            policy,
            active_state,
            inner: Mutex::new(ObserverState {
                phase: Phase::Locked,
                delivering: false,
                last_value: None,
                last_undelivered: None,
                subscriber: Some(Arc::new(subscriber)),
                upstream: None,
                lifecycle: WeakLifecycle::default(),
                key: None,
            }),
        })
    }

    /// Register with `lifecycle`; the observer unlocks right away if it is
    /// already active.
    pub fn attach(self: &Arc<Self>, lifecycle: &Lifecycle) -> Result<(), MviError> {
        self.inner.lock().lifecycle = lifecycle.downgrade();
        let key = lifecycle.add_observer(Arc::clone(self) as Arc<dyn LifecycleObserver>)?;
        let disposed = {
            let mut state = self.inner.lock();
            state.key = Some(key);
            state.phase == Phase::Disposed
        };
        if disposed {
            lifecycle.remove_observer(key);
        }
        Ok(())
    }

    /// Take ownership of the upstream subscription feeding this observer.
    pub fn set_upstream(&self, upstream: Subscription) {
        let rejected = {
            let mut state = self.inner.lock();
            if state.phase == Phase::Disposed {
                Some(upstream)
            } else {
                state.upstream = Some(upstream);
                None
            }
        };
        if let Some(upstream) = rejected {
            upstream.dispose();
        }
    }

    /// Offer a value from upstream.
    pub fn on_next(&self, value: T) {
        let mut state = self.inner.lock();
        if state.phase == Phase::Disposed {
            return;
        }
        state.last_value = Some(value.clone());
        state.last_undelivered = Some(value);
        if state.phase == Phase::Unlocked {
            self.drain(state);
        }
    }

    /// Unlock without a lifecycle. Used for subscriptions that have no owner
    /// and therefore deliver until disposed.
    pub fn activate(&self) {
        self.unlock();
    }

    pub fn is_locked(&self) -> bool {
        self.inner.lock().phase == Phase::Locked
    }

    /// Wrap in a [`Subscription`] handle.
    pub fn subscription(self: &Arc<Self>) -> Subscription {
        Subscription::from_arc(Arc::clone(self) as Arc<dyn Disposable>)
    }

    fn unlock(&self) {
        let mut state = self.inner.lock();
        if state.phase != Phase::Locked {
            return;
        }
        state.phase = Phase::Unlocked;
        if self.policy == DeliveryPolicy::LastValue && state.last_undelivered.is_none() {
            state.last_undelivered = state.last_value.clone();
        }
        self.drain(state);
    }

    /// Deliver pending values until none is left or the observer stops being
    /// unlocked. Returns at once if another call is already delivering.
    fn drain(&self, mut state: MutexGuard<'_, ObserverState<T>>) {
        if state.delivering {
            return;
        }
        state.delivering = true;
        drop(state);
        let _reset = scopeguard::guard_on_unwind((), |()| self.inner.lock().delivering = false);

        let mut state = self.inner.lock();
        loop {
            let next = match state.phase {
                Phase::Unlocked => state
                    .last_undelivered
                    .take()
                    .zip(state.subscriber.clone()),
                Phase::Locked | Phase::Disposed => None,
            };
            let Some((value, subscriber)) = next else {
                state.delivering = false;
                return;
            };
            drop(state);
            subscriber(value);
            state = self.inner.lock();
        }
    }

    fn lock(&self) {
        let mut state = self.inner.lock();
        if state.phase == Phase::Unlocked {
            state.phase = Phase::Locked;
        }
    }
}

impl<T: Clone + Send + 'static> LifecycleObserver for LifecycleAwareObserver<T> {
    fn on_state_changed(&self, state: LifecycleState) {
        if state == LifecycleState::Destroyed {
            self.dispose();
        } else if state.is_at_least(self.active_state) {
            self.unlock();
        } else {
            self.lock();
        }
    }
}

impl<T: Clone + Send + 'static> Disposable for LifecycleAwareObserver<T> {
    fn dispose(&self) {
        let (upstream, lifecycle, key, subscriber) = {
            let mut state = self.inner.lock();
            if state.phase == Phase::Disposed {
                return;
            }
            state.phase = Phase::Disposed;
            state.last_value = None;
            state.last_undelivered = None;
            (
                state.upstream.take(),
                std::mem::take(&mut state.lifecycle),
                state.key.take(),
                state.subscriber.take(),
            )
        };
        if let Some(key) = key {
            lifecycle.remove_observer(key);
        }
        if let Some(upstream) = upstream {
            upstream.dispose();
        }
        drop(subscriber);
    }

    fn is_disposed(&self) -> bool {
        self.inner.lock().phase == Phase::Disposed
    }
}

impl<T> fmt::Debug for LifecycleAwareObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleAwareObserver")
            .field("policy", &self.policy)
            .field("active_state", &self.active_state)
            .field("phase", &self.inner.lock().phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(policy: DeliveryPolicy) -> (Arc<LifecycleAwareObserver<i32>>, Arc<Mutex<Vec<i32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = LifecycleAwareObserver::new(policy, move |v| sink.lock().push(v));
        (observer, seen)
    }

    #[test]
    fn buffers_while_locked_and_flushes_latest_on_unlock() {
        let lifecycle = Lifecycle::with_state(LifecycleState::Created);
        let (observer, seen) = recording(DeliveryPolicy::LastUndelivered);
        observer.attach(&lifecycle).unwrap();

        observer.on_next(1);
        observer.on_next(2);
        assert!(seen.lock().is_empty());

        lifecycle.move_to(LifecycleState::Started);
        assert_eq!(*seen.lock(), vec![2]);

        lifecycle.move_to(LifecycleState::Resumed);
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn last_undelivered_skips_already_delivered_value() {
        let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
        let (observer, seen) = recording(DeliveryPolicy::LastUndelivered);
        observer.attach(&lifecycle).unwrap();

        observer.on_next(1);
        lifecycle.move_to(LifecycleState::Created);
        lifecycle.move_to(LifecycleState::Resumed);
        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn last_value_redelivers_on_every_unlock() {
        let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
        let (observer, seen) = recording(DeliveryPolicy::LastValue);
        observer.attach(&lifecycle).unwrap();

        observer.on_next(1);
        lifecycle.move_to(LifecycleState::Created);
        lifecycle.move_to(LifecycleState::Started);
        assert_eq!(*seen.lock(), vec![1, 1]);
    }

    #[test]
    fn destroyed_lifecycle_disposes_observer_and_upstream() {
        let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
        let (observer, seen) = recording(DeliveryPolicy::LastUndelivered);
        observer.attach(&lifecycle).unwrap();
        let upstream = Subscription::from_fn(|| {});
        observer.set_upstream(upstream.clone());

        lifecycle.move_to(LifecycleState::Destroyed);
        assert!(observer.is_disposed());
        assert!(upstream.is_disposed());

        observer.on_next(7);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn explicit_dispose_detaches_from_lifecycle() {
        let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
        let (observer, _seen) = recording(DeliveryPolicy::LastValue);
        observer.attach(&lifecycle).unwrap();
        assert_eq!(lifecycle.observer_count(), 1);

        observer.subscription().dispose();
        assert_eq!(lifecycle.observer_count(), 0);
    }

    #[test]
    fn subscriber_may_dispose_itself_during_delivery() {
        let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let handle = Arc::clone(&slot);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = LifecycleAwareObserver::new(DeliveryPolicy::LastUndelivered, move |v: i32| {
            sink.lock().push(v);
            if let Some(sub) = handle.lock().clone() {
                sub.dispose();
            }
        });
        *slot.lock() = Some(observer.subscription());
        observer.attach(&lifecycle).unwrap();

        observer.on_next(1);
        observer.on_next(2);
        assert_eq!(*seen.lock(), vec![1]);
        assert!(observer.is_disposed());
    }

    #[test]
    fn value_from_another_thread_during_unlock_delivery_does_not_block() {
        let lifecycle = Lifecycle::with_state(LifecycleState::Created);
        let slot: Arc<Mutex<Option<std::sync::Weak<LifecycleAwareObserver<i32>>>>> =
            Arc::new(Mutex::new(None));
        let handle = Arc::clone(&slot);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = LifecycleAwareObserver::new(DeliveryPolicy::LastUndelivered, move |v: i32| {
            if v == 1 {
                let weak = handle.lock().clone().unwrap();
                std::thread::spawn(move || {
                    if let Some(observer) = weak.upgrade() {
                        observer.on_next(2);
                    }
                })
                .join()
                .unwrap();
            }
            sink.lock().push(v);
        });
        *slot.lock() = Some(Arc::downgrade(&observer));
        observer.attach(&lifecycle).unwrap();

        observer.on_next(1);
        lifecycle.move_to(LifecycleState::Started);
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn nested_value_is_delivered_after_the_current_one() {
        let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
        let slot: Arc<Mutex<Option<std::sync::Weak<LifecycleAwareObserver<i32>>>>> =
            Arc::new(Mutex::new(None));
        let handle = Arc::clone(&slot);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = LifecycleAwareObserver::new(DeliveryPolicy::LastUndelivered, move |v: i32| {
            sink.lock().push(v);
            if v == 1 {
                if let Some(observer) = handle.lock().as_ref().and_then(|weak| weak.upgrade()) {
                    observer.on_next(2);
                }
                sink.lock().push(10);
            }
        });
        *slot.lock() = Some(Arc::downgrade(&observer));
        observer.attach(&lifecycle).unwrap();

        observer.on_next(1);
        assert_eq!(*seen.lock(), vec![1, 10, 2]);
    }
}
