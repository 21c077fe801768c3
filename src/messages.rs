//! One-shot messages from a view model to its view.
//!
//! Unlike state, messages are not replayed: each one is delivered once to the
//! subscribers present when it is sent. Messages sent while nobody listens
//! are kept and handed, in order, to the next subscriber.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use crate::dispatch::Dispatcher;
use crate::disposable::{Disposable, Subscription};
use crate::error::MviError;
use crate::lifecycle::{Lifecycle, LifecycleObserver, LifecycleState, ObserverKey, WeakLifecycle};

type Handler<M> = Arc<dyn Fn(M) + Send + Sync>;

/// Buffer-until-subscribed multicast queue.
pub struct MessageQueue<M> {
    inner: Arc<QueueInner<M>>,
}

struct QueueInner<M> {
    state: Mutex<QueueState<M>>,
    next_id: AtomicU64,
    emit: ReentrantMutex<()>,
}

struct QueueState<M> {
    pending: VecDeque<M>,
    subscribers: Vec<(u64, Handler<M>)>,
    disposed: bool,
}

impl<M> Clone for MessageQueue<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Clone + Send + 'static> MessageQueue<M> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    subscribers: Vec::new(),
                    disposed: false,
                }),
                next_id: AtomicU64::new(1),
                emit: ReentrantMutex::new(()),
            }),
        }
    }

    /// Deliver `message` to current subscribers, or keep it for the next one.
    pub fn send(&self, message: M) {
        let _emit = self.inner.emit.lock();
        let handlers: Vec<Handler<M>> = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                tracing::trace!("message queue disposed; dropping message");
                return;
            }
            if state.subscribers.is_empty() {
                state.pending.push_back(message);
                return;
            }
            state
                .subscribers
                .iter()
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };
        for handler in handlers {
            handler(message.clone());
        }
    }

    /// Register `handler`; anything queued so far is delivered to it first.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(M) + Send + Sync + 'static,
    {
        let handler: Handler<M> = Arc::new(handler);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let _emit = self.inner.emit.lock();
        let backlog = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return Subscription::disposed();
            }
            state.subscribers.push((id, Arc::clone(&handler)));
            std::mem::take(&mut state.pending)
        };
        for message in backlog {
            handler(message);
        }

        Subscription::new(QueueSubscription {
            queue: Arc::downgrade(&self.inner),
            id,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn pending(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.state.lock().subscribers.len()
    }

    /// Drop subscribers and queued messages; later sends are ignored.
    pub fn dispose(&self) {
        let (subscribers, pending) = {
            let mut state = self.inner.state.lock();
            state.disposed = true;
            (
                std::mem::take(&mut state.subscribers),
                std::mem::take(&mut state.pending),
            )
        };
        drop(subscribers);
        drop(pending);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }
}

impl<M: Clone + Send + 'static> Default for MessageQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

struct QueueSubscription<M> {
    queue: Weak<QueueInner<M>>,
    id: u64,
    disposed: AtomicBool,
}

impl<M: Send> Disposable for QueueSubscription<M> {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(queue) = self.queue.upgrade() {
            let removed = {
                let mut state = queue.state.lock();
                state
                    .subscribers
                    .iter()
                    .position(|(id, _)| *id == self.id)
                    .map(|index| state.subscribers.remove(index))
            };
            drop(removed);
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Subscribes a handler to a [`MessageQueue`] only while its lifecycle is at
/// least `Started`.
///
/// While stopped the observer is not subscribed, so messages sent meanwhile
/// stay queued and arrive on restart.
pub(crate) struct MessageObserver<M> {
    queue: MessageQueue<M>,
    handler: Handler<M>,
    dispatcher: Arc<dyn Dispatcher>,
    delivery: Arc<Delivery<M>>,
    inner: Mutex<MessageObserverState>,
}

/// Gate checked by dispatched tasks when they run, not when they are queued.
///
/// A message whose task runs while the observer is stopped is held and
/// redelivered first on the next start. Once disposed, everything is dropped.
struct Delivery<M> {
    held: Mutex<HeldMessages<M>>,
}

struct HeldMessages<M> {
    messages: VecDeque<M>,
    started: bool,
    disposed: bool,
}

impl<M> Delivery<M> {
    fn new() -> Self {
        Self {
            held: Mutex::new(HeldMessages {
                messages: VecDeque::new(),
                started: false,
                disposed: false,
            }),
        }
    }

    fn deliver(&self, message: M, handler: &Handler<M>) {
        {
            let mut held = self.held.lock();
            if held.disposed {
                tracing::trace!("message observer disposed; dropping message");
                return;
            }
            if !held.started {
                held.messages.push_back(message);
                return;
            }
        }
        handler(message);
    }

    /// Mark started and return what was held while stopped.
    fn start(&self) -> VecDeque<M> {
        let mut held = self.held.lock();
        held.started = true;
        std::mem::take(&mut held.messages)
    }

    fn stop(&self) {
        self.held.lock().started = false;
    }

    fn dispose(&self) {
        let dropped = {
            let mut held = self.held.lock();
            held.disposed = true;
            held.started = false;
            std::mem::take(&mut held.messages)
        };
        drop(dropped);
    }
}

#[derive(Default)]
struct MessageObserverState {
    active: Option<Subscription>,
    lifecycle: WeakLifecycle,
    key: Option<ObserverKey>,
    disposed: bool,
}

impl<M: Clone + Send + 'static> MessageObserver<M> {
    pub(crate) fn new<F>(queue: MessageQueue<M>, dispatcher: Arc<dyn Dispatcher>, handler: F) -> Arc<Self>
    where
        F: Fn(M) + Send + Sync + 'static,
    {
        Arc::new(Self {
            queue,
            handler: Arc::new(handler),
            dispatcher,
            delivery: Arc::new(Delivery::new()),
            inner: Mutex::new(MessageObserverState::default()),
        })
    }

    /// Bind to `lifecycle`, or subscribe for good when there is none.
    pub(crate) fn attach(self: &Arc<Self>, lifecycle: Option<&Lifecycle>) -> Result<Subscription, MviError> {
        match lifecycle {
            Some(lifecycle) => {
                self.inner.lock().lifecycle = lifecycle.downgrade();
                let key = lifecycle.add_observer(Arc::clone(self) as Arc<dyn LifecycleObserver>)?;
                self.inner.lock().key = Some(key);
            }
            None => self.start(),
        }
        Ok(Subscription::from_arc(Arc::clone(self) as Arc<dyn Disposable>))
    }

    fn start(&self) {
        {
            let state = self.inner.lock();
            if state.disposed || state.active.is_some() {
                return;
            }
        }
        for message in self.delivery.start() {
            self.dispatch(message);
        }
        let handler = Arc::clone(&self.handler);
        let dispatcher = Arc::clone(&self.dispatcher);
        let delivery = Arc::clone(&self.delivery);
        let subscription = self.queue.subscribe(move |message: M| {
            let handler = Arc::clone(&handler);
            let delivery = Arc::clone(&delivery);
            dispatcher.dispatch(Box::new(move || delivery.deliver(message, &handler)));
        });
        let rejected = {
            let mut state = self.inner.lock();
            if state.disposed || state.active.is_some() {
                Some(subscription)
            } else {
                state.active = Some(subscription);
                None
            }
        };
        if let Some(subscription) = rejected {
            subscription.dispose();
        }
    }

    fn dispatch(&self, message: M) {
        let handler = Arc::clone(&self.handler);
        let delivery = Arc::clone(&self.delivery);
        self.dispatcher
            .dispatch(Box::new(move || delivery.deliver(message, &handler)));
    }

    fn stop(&self) {
        self.delivery.stop();
        let active = self.inner.lock().active.take();
        if let Some(subscription) = active {
            subscription.dispose();
        }
    }
}

impl<M: Clone + Send + 'static> LifecycleObserver for MessageObserver<M> {
    fn on_state_changed(&self, state: LifecycleState) {
        if state == LifecycleState::Destroyed {
            self.dispose();
        } else if state.is_at_least(LifecycleState::Started) {
            self.start();
        } else {
            self.stop();
        }
    }
}

impl<M: Clone + Send + 'static> Disposable for MessageObserver<M> {
    fn dispose(&self) {
        let (active, lifecycle, key) = {
            let mut state = self.inner.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            (
                state.active.take(),
                std::mem::take(&mut state.lifecycle),
                state.key.take(),
            )
        };
        self.delivery.dispose();
        if let Some(subscription) = active {
            subscription.dispose();
        }
        if let Some(key) = key {
            lifecycle.remove_observer(key);
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }
}
