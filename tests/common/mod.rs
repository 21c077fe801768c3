//! Shared test utilities.

#![allow(dead_code, unused_imports)]

use parking_lot::Mutex;
use statecraft::{MviState, StateStore, ViewModel};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestState {
    pub count: i32,
    pub label: String,
    pub flag: bool,
}

impl MviState for TestState {}

/// Collects values handed to a callback.
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sink(&self) -> impl Fn(T) + Send + Sync + 'static {
        let values = Arc::clone(&self.values);
        move |value| values.lock().push(value)
    }

    pub fn push(&self, value: T) {
        self.values.lock().push(value);
    }

    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }
}

/// Block until the store has applied everything submitted so far and
/// return the resulting state.
pub fn settle<S: MviState>(store: &StateStore<S>) -> S {
    let (tx, rx) = mpsc::channel();
    store.get(move |state| {
        let _ = tx.send(state.clone());
    });
    rx.recv_timeout(WAIT).expect("store did not answer in time")
}

pub fn settle_vm<S: MviState, M: Clone + Send + 'static>(vm: &ViewModel<S, M>) -> S {
    settle(vm.store())
}

/// Poll `condition` until it holds or the wait expires.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Wait until the view model's state satisfies `predicate`.
pub async fn wait_for_state<S, M, P>(vm: &ViewModel<S, M>, predicate: P) -> S
where
    S: MviState,
    M: Clone + Send + 'static,
    P: Fn(&S) -> bool,
{
    for _ in 0..200 {
        let state = vm.await_state().await.expect("view model stopped");
        if predicate(&state) {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("state never matched");
}

/// A stream over a fixed list of items.
pub struct IterStream<T> {
    items: std::collections::VecDeque<T>,
}

impl<T> IterStream<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
        }
    }
}

impl<T: Unpin> futures_core::Stream for IterStream<T> {
    type Item = T;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<T>> {
        std::task::Poll::Ready(self.items.pop_front())
    }
}

/// A stream fed through a channel; stays open until the sender is dropped.
pub struct ChannelStream<T> {
    rx: tokio::sync::mpsc::UnboundedReceiver<T>,
}

pub fn channel_stream<T>() -> (tokio::sync::mpsc::UnboundedSender<T>, ChannelStream<T>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (tx, ChannelStream { rx })
}

impl<T> futures_core::Stream for ChannelStream<T> {
    type Item = T;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
