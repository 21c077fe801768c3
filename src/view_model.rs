//! The view model: composition root of a screen's state.
//!
//! A [`ViewModel`] owns one [`StateStore`], one [`MessageQueue`] and every
//! subscription and execution created through it. Views talk to it through
//! three channels only: submitting reducers, reading state, and subscribing.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_core::Stream;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::async_state::{Async, AsyncError, Metadata};
use crate::dispatch::{immediate, Dispatcher};
use crate::disposable::{CompositeDisposable, Disposable, Subscription};
use crate::error::MviError;
use crate::execute::{self, ExecutionHandle};
use crate::lifecycle::{DeliveryPolicy, Lifecycle, LifecycleAwareObserver};
use crate::messages::{MessageObserver, MessageQueue};
use crate::mvi::{MviState, Reducer};
use crate::store::{StateStore, StoreOptions};

/// Holds the state of one screen and mediates every change to it.
///
/// `M` is the type of one-shot messages sent to the view (toasts, navigation);
/// it defaults to `()` for view models that send none.
///
/// Clearing the view model (explicitly or by dropping it) disposes every
/// subscription and execution it created and stops its store.
pub struct ViewModel<S: MviState, M: Clone + Send + 'static = ()> {
    store: StateStore<S>,
    messages: MessageQueue<M>,
    dispatcher: Arc<dyn Dispatcher>,
    runtime: Option<Handle>,
    disposables: CompositeDisposable,
    cleared: AtomicBool,
}

/// Configures a [`ViewModel`] before its store starts.
pub struct ViewModelBuilder<S: MviState, M = ()> {
    initial: S,
    options: StoreOptions,
    dispatcher: Arc<dyn Dispatcher>,
    runtime: Option<Handle>,
    _messages: PhantomData<fn() -> M>,
}

impl<S: MviState, M: Clone + Send + 'static> ViewModelBuilder<S, M> {
    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.options.debug_mode = enabled;
        self
    }

    /// Where subscriber callbacks run. Defaults to inline delivery.
    pub fn dispatcher<D: Dispatcher + 'static>(mut self, dispatcher: D) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    /// Runtime used by the `execute*` family. Defaults to the runtime
    /// current at `build()`, if any.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> ViewModel<S, M> {
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());
        ViewModel {
            store: StateStore::with_options(self.initial, self.options),
            messages: MessageQueue::new(),
            dispatcher: self.dispatcher,
            runtime,
            disposables: CompositeDisposable::new(),
            cleared: AtomicBool::new(false),
        }
    }
}

impl<S: MviState, M: Clone + Send + 'static> ViewModel<S, M> {
    pub fn new(initial: S) -> Self {
        Self::builder(initial).build()
    }

    pub fn builder(initial: S) -> ViewModelBuilder<S, M> {
        ViewModelBuilder {
            initial,
            options: StoreOptions::default(),
            dispatcher: immediate(),
            runtime: None,
            _messages: PhantomData,
        }
    }

    // --- State -----------------------------------------------------------

    /// Submit a reducer. Returns immediately.
    pub fn set_state<F>(&self, reducer: F)
    where
        F: Fn(&S) -> S + Send + 'static,
    {
        self.store.set(reducer);
    }

    /// Submit `intent` through the typed reducer `R`.
    pub fn dispatch<R>(&self, intent: R::Intent)
    where
        R: Reducer<State = S> + 'static,
    {
        self.store.set(move |state| R::reduce(state, &intent));
    }

    /// Run `block` with the state after every reducer submitted so far.
    /// Returns immediately; `block` runs on the store's worker.
    pub fn with_state<F>(&self, block: F)
    where
        F: FnOnce(&S) + Send + 'static,
    {
        self.store.get(block);
    }

    /// Snapshot of the latest published state.
    pub fn state(&self) -> S {
        self.store.state()
    }

    /// Resolve with the state after every reducer submitted so far.
    pub async fn await_state(&self) -> Result<S, MviError> {
        let (tx, rx) = oneshot::channel();
        self.store.get(move |state| {
            let _ = tx.send(state.clone());
        });
        rx.await.map_err(|_| match self.store.failure() {
            Some(failure) => MviError::Store(failure),
            None => MviError::Disposed,
        })
    }

    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    // --- Subscriptions -------------------------------------------------------

    /// Receive every distinct state.
    ///
    /// With an owner, delivery happens only while it is at least `Started`,
    /// and the latest state is redelivered each time it becomes active again.
    pub fn subscribe<F>(&self, owner: Option<&Lifecycle>, callback: F) -> Result<Subscription, MviError>
    where
        F: Fn(S) + Send + Sync + 'static,
    {
        self.observe(owner, |state: &S| state.clone(), callback)
    }

    /// Receive one projected property, only when it changes.
    pub fn select_subscribe<A, P, F>(
        &self,
        owner: Option<&Lifecycle>,
        prop: P,
        callback: F,
    ) -> Result<Subscription, MviError>
    where
        A: Clone + PartialEq + Send + 'static,
        P: Fn(&S) -> A + Send + Sync + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        self.observe(owner, prop, callback)
    }

    pub fn select_subscribe2<A, B, PA, PB, F>(
        &self,
        owner: Option<&Lifecycle>,
        prop1: PA,
        prop2: PB,
        callback: F,
    ) -> Result<Subscription, MviError>
    where
        A: Clone + PartialEq + Send + 'static,
        B: Clone + PartialEq + Send + 'static,
        PA: Fn(&S) -> A + Send + Sync + 'static,
        PB: Fn(&S) -> B + Send + Sync + 'static,
        F: Fn(A, B) + Send + Sync + 'static,
    {
        self.observe(
            owner,
            move |state: &S| (prop1(state), prop2(state)),
            move |(a, b): (A, B)| callback(a, b),
        )
    }

    pub fn select_subscribe3<A, B, C, PA, PB, PC, F>(
        &self,
        owner: Option<&Lifecycle>,
        prop1: PA,
        prop2: PB,
        prop3: PC,
        callback: F,
    ) -> Result<Subscription, MviError>
    where
        A: Clone + PartialEq + Send + 'static,
        B: Clone + PartialEq + Send + 'static,
        C: Clone + PartialEq + Send + 'static,
        PA: Fn(&S) -> A + Send + Sync + 'static,
        PB: Fn(&S) -> B + Send + Sync + 'static,
        PC: Fn(&S) -> C + Send + Sync + 'static,
        F: Fn(A, B, C) + Send + Sync + 'static,
    {
        self.observe(
            owner,
            move |state: &S| (prop1(state), prop2(state), prop3(state)),
            move |(a, b, c): (A, B, C)| callback(a, b, c),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn select_subscribe4<A, B, C, D, PA, PB, PC, PD, F>(
        &self,
        owner: Option<&Lifecycle>,
        prop1: PA,
        prop2: PB,
        prop3: PC,
        prop4: PD,
        callback: F,
    ) -> Result<Subscription, MviError>
    where
        A: Clone + PartialEq + Send + 'static,
        B: Clone + PartialEq + Send + 'static,
        C: Clone + PartialEq + Send + 'static,
        D: Clone + PartialEq + Send + 'static,
        PA: Fn(&S) -> A + Send + Sync + 'static,
        PB: Fn(&S) -> B + Send + Sync + 'static,
        PC: Fn(&S) -> C + Send + Sync + 'static,
        PD: Fn(&S) -> D + Send + Sync + 'static,
        F: Fn(A, B, C, D) + Send + Sync + 'static,
    {
        self.observe(
            owner,
            move |state: &S| (prop1(state), prop2(state), prop3(state), prop4(state)),
            move |(a, b, c, d): (A, B, C, D)| callback(a, b, c, d),
        )
    }

    /// Follow one `Async` property: `Success` values go to `on_success`,
    /// failures to `on_fail`. `Loading` and `Uninitialized` are skipped.
    pub fn async_subscribe<T, P, FailFn, SuccessFn>(
        &self,
        owner: Option<&Lifecycle>,
        prop: P,
        on_fail: FailFn,
        on_success: SuccessFn,
    ) -> Result<Subscription, MviError>
    where
        T: Clone + PartialEq + Send + 'static,
        P: Fn(&S) -> Async<T> + Send + Sync + 'static,
        FailFn: Fn(AsyncError) + Send + Sync + 'static,
        SuccessFn: Fn(T) + Send + Sync + 'static,
    {
        self.observe(owner, prop, move |value: Async<T>| match value {
            Async::Success { value, .. } => on_success(value),
            Async::Fail { error, .. } => on_fail(error),
            Async::Uninitialized | Async::Loading { .. } => {}
        })
    }

    /// Project, deduplicate, dispatch, gate.
    fn observe<P, Project, F>(
        &self,
        owner: Option<&Lifecycle>,
        project: Project,
        callback: F,
    ) -> Result<Subscription, MviError>
    where
        P: Clone + PartialEq + Send + 'static,
        Project: Fn(&S) -> P + Send + Sync + 'static,
        F: Fn(P) + Send + Sync + 'static,
    {
        self.ensure_active()?;

        let observer = LifecycleAwareObserver::new(DeliveryPolicy::LastValue, callback);
        match owner {
            Some(lifecycle) => observer.attach(lifecycle)?,
            None => observer.activate(),
        }

        let target = Arc::clone(&observer);
        let dispatcher = Arc::clone(&self.dispatcher);
        let last: Mutex<Option<P>> = Mutex::new(None);
        let upstream = self.store.subscribe(move |state: &S| {
            let projected = project(state);
            {
                let mut last = last.lock();
                if last.as_ref() == Some(&projected) {
                    return;
                }
                *last = Some(projected.clone());
            }
            let target = Arc::clone(&target);
            dispatcher.dispatch(Box::new(move || target.on_next(projected)));
        });
        observer.set_upstream(upstream);

        Ok(self.disposables.add(observer.subscription()))
    }

    // --- Async execution -------------------------------------------------------

    /// Run a one-shot future, reflecting its progress through `reducer`.
    pub fn execute<T, E, Fut, R>(&self, future: Fut, reducer: R) -> Result<ExecutionHandle, MviError>
    where
        T: Clone + Send + Sync + 'static,
        E: Into<anyhow::Error> + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        R: Fn(&S, Async<T>) -> S + Send + Sync + 'static,
    {
        self.execute_mapped(future, |value| value, reducer)
    }

    /// Like [`ViewModel::execute`], mapping the result before it is stored.
    pub fn execute_mapped<T, V, E, Fut, Map, R>(
        &self,
        future: Fut,
        mapper: Map,
        reducer: R,
    ) -> Result<ExecutionHandle, MviError>
    where
        T: Send + 'static,
        V: Clone + Send + Sync + 'static,
        E: Into<anyhow::Error> + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        Map: Fn(T) -> V + Send + Sync + 'static,
        R: Fn(&S, Async<V>) -> S + Send + Sync + 'static,
    {
        let runtime = self.runtime_handle()?;
        let handle = execute::spawn_future(
            &runtime,
            self.store.clone(),
            future,
            Box::new(mapper),
            None,
            Arc::new(reducer),
        );
        self.disposables.add(Subscription::new(handle.clone()));
        Ok(handle)
    }

    /// Run a stream; every item becomes `Success`, the first error `Fail`.
    pub fn execute_stream<T, E, St, R>(&self, stream: St, reducer: R) -> Result<ExecutionHandle, MviError>
    where
        T: Clone + Send + Sync + 'static,
        E: Into<anyhow::Error> + Send + 'static,
        St: Stream<Item = Result<T, E>> + Send + 'static,
        R: Fn(&S, Async<T>) -> S + Send + Sync + 'static,
    {
        self.execute_stream_with(stream, |value| value, |_: &T| None, reducer)
    }

    /// Stream execution with a value mapper and success metadata.
    pub fn execute_stream_with<T, V, E, St, Map, Meta, R>(
        &self,
        stream: St,
        mapper: Map,
        metadata: Meta,
        reducer: R,
    ) -> Result<ExecutionHandle, MviError>
    where
        T: Send + 'static,
        V: Clone + Send + Sync + 'static,
        E: Into<anyhow::Error> + Send + 'static,
        St: Stream<Item = Result<T, E>> + Send + 'static,
        Map: Fn(T) -> V + Send + Sync + 'static,
        Meta: Fn(&T) -> Option<Metadata> + Send + Sync + 'static,
        R: Fn(&S, Async<V>) -> S + Send + Sync + 'static,
    {
        let runtime = self.runtime_handle()?;
        let handle = execute::spawn_stream(
            &runtime,
            self.store.clone(),
            stream,
            Box::new(mapper),
            Some(Box::new(metadata)),
            Arc::new(reducer),
        );
        self.disposables.add(Subscription::new(handle.clone()));
        Ok(handle)
    }

    fn runtime_handle(&self) -> Result<Handle, MviError> {
        self.ensure_active()?;
        self.runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or(MviError::NoRuntime)
    }

    // --- Messages -------------------------------------------------------------

    pub fn send_message(&self, message: M) {
        self.messages.send(message);
    }

    /// Receive messages while `owner` is at least `Started`. Messages sent
    /// while nobody receives them are delivered on the next subscription.
    pub fn subscribe_messages<F>(&self, owner: Option<&Lifecycle>, callback: F) -> Result<Subscription, MviError>
    where
        F: Fn(M) + Send + Sync + 'static,
    {
        self.ensure_active()?;
        let observer = MessageObserver::new(self.messages.clone(), Arc::clone(&self.dispatcher), callback);
        let subscription = observer.attach(owner)?;
        Ok(self.disposables.add(subscription))
    }

    // --- Housekeeping ---------------------------------------------------------

    /// Log every new state at debug level. Only active in debug mode.
    pub fn log_state_changes(&self) {
        if !self.store.options().debug_mode {
            return;
        }
        let state_type = std::any::type_name::<S>();
        let subscription = self.store.subscribe(move |state: &S| {
            tracing::debug!(state_type, state = ?state, "state changed");
        });
        self.disposables.add(subscription);
    }

    /// Dispose `subscription` when this view model is cleared.
    pub fn dispose_on_clear(&self, subscription: Subscription) -> Subscription {
        self.disposables.add(subscription)
    }

    /// Dispose every subscription and execution and stop the store. Idempotent.
    pub fn clear(&self) {
        if self.cleared.swap(true, Ordering::SeqCst) {
            return;
        }
        self.disposables.dispose();
        self.messages.dispose();
        self.store.dispose();
        tracing::debug!(state_type = std::any::type_name::<S>(), "view model cleared");
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<(), MviError> {
        if self.is_cleared() {
            return Err(MviError::Disposed);
        }
        if let Some(failure) = self.store.failure() {
            return Err(MviError::Store(failure));
        }
        Ok(())
    }
}

impl<S: MviState, M: Clone + Send + 'static> Drop for ViewModel<S, M> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Read the current state of `vm` synchronously.
pub fn with_state<S, M, R, F>(vm: &ViewModel<S, M>, block: F) -> R
where
    S: MviState,
    M: Clone + Send + 'static,
    F: FnOnce(&S) -> R,
{
    block(&vm.state())
}

/// Read the current states of two view models synchronously.
pub fn with_state2<S1, M1, S2, M2, R, F>(vm1: &ViewModel<S1, M1>, vm2: &ViewModel<S2, M2>, block: F) -> R
where
    S1: MviState,
    S2: MviState,
    M1: Clone + Send + 'static,
    M2: Clone + Send + 'static,
    F: FnOnce(&S1, &S2) -> R,
{
    block(&vm1.state(), &vm2.state())
}
