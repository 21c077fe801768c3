mod common;

use common::{settle, wait_until, Recorder, TestState, WAIT};
use parking_lot::Mutex;
use statecraft::{Disposable, MviState, StateStore, StoreError, StoreOptions};
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

#[test]
fn writes_fold_in_submission_order() {
    let store = StateStore::new(TestState::default());
    store.set(|s| TestState { label: format!("{}a", s.label), ..s.clone() });
    store.set(|s| TestState { label: format!("{}b", s.label), ..s.clone() });
    store.set(|s| TestState { label: format!("{}c", s.label), ..s.clone() });

    assert_eq!(settle(&store).label, "abc");
}

#[test]
fn five_increments_then_read_sees_five() {
    let store = StateStore::new(TestState::default());
    for _ in 0..5 {
        store.set(|s| TestState { count: s.count + 1, ..s.clone() });
    }
    let (tx, rx) = mpsc::channel();
    store.get(move |s| tx.send(s.count).unwrap());
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 5);
}

#[test]
fn read_sees_writes_enqueued_from_inside_earlier_read() {
    let store = StateStore::new(TestState::default());
    let (tx, rx) = mpsc::channel();
    let inner = store.clone();
    store.get(move |_| {
        inner.set(|s| TestState { count: 10, ..s.clone() });
        let tx = tx.clone();
        inner.get(move |s| tx.send(s.count).unwrap());
    });
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 10);
}

#[test]
fn writes_from_many_threads_are_all_applied() {
    let store = StateStore::new(TestState::default());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    store.set(|s| TestState { count: s.count + 1, ..s.clone() });
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(settle(&store).count, 800);
}

#[test]
fn subscribers_see_distinct_states_only() {
    let store = StateStore::new(TestState::default());
    let seen = Recorder::new();
    let sink = seen.sink();
    let _sub = store.subscribe(move |s: &TestState| sink(s.count));

    store.set(|s| TestState { count: 1, ..s.clone() });
    settle(&store);
    store.set(|s| s.clone());
    settle(&store);
    store.set(|s| TestState { count: 2, ..s.clone() });
    settle(&store);

    assert_eq!(seen.values(), vec![0, 1, 2]);
}

#[test]
fn debug_mode_detects_impure_reducer() {
    let store = StateStore::with_options(TestState::default(), StoreOptions::debug());
    let calls = Arc::new(AtomicI32::new(0));
    let counter = Arc::clone(&calls);
    store.set(move |s| TestState {
        count: counter.fetch_add(1, Ordering::SeqCst),
        ..s.clone()
    });

    assert!(wait_until(|| store.failure().is_some()));
    assert!(matches!(
        store.failure(),
        Some(StoreError::PurityViolation { .. })
    ));
    assert!(store.is_disposed());
    assert!(wait_until(|| !store.is_worker_running()));
}

#[test]
fn impure_reducer_is_not_checked_outside_debug_mode() {
    let store = StateStore::new(TestState::default());
    let calls = Arc::new(AtomicI32::new(1));
    let counter = Arc::clone(&calls);
    store.set(move |s| TestState {
        count: counter.fetch_add(1, Ordering::SeqCst),
        ..s.clone()
    });
    assert_eq!(settle(&store).count, 1);
    assert!(store.failure().is_none());
}

/// State whose equality ignores a shared cell, so mutating the cell after
/// publication goes unnoticed by dedup but not by the debug checker.
#[derive(Clone, Default)]
struct LeakyState {
    version: u32,
    shared: Arc<Mutex<i32>>,
}

impl PartialEq for LeakyState {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for LeakyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeakyState")
            .field("version", &self.version)
            .field("shared", &*self.shared.lock())
            .finish()
    }
}

impl MviState for LeakyState {}

#[test]
fn debug_mode_detects_mutation_after_publish() {
    let initial = LeakyState::default();
    let cell = Arc::clone(&initial.shared);
    let store = StateStore::with_options(initial, StoreOptions::debug());

    store.set(|s| LeakyState { version: 1, ..s.clone() });
    settle(&store);

    *cell.lock() = 99;
    store.set(|s| LeakyState { version: 2, ..s.clone() });

    assert!(wait_until(|| store.failure().is_some()));
    assert!(matches!(
        store.failure(),
        Some(StoreError::MutatedState { .. })
    ));
}

#[test]
fn panicking_reducer_fails_the_store() {
    let store = StateStore::new(TestState::default());
    store.set(|_| panic!("reducer exploded"));

    assert!(wait_until(|| store.failure().is_some()));
    match store.failure() {
        Some(StoreError::WorkerPanicked { message }) => assert!(message.contains("exploded")),
        other => panic!("unexpected failure: {other:?}"),
    }
    assert!(wait_until(|| !store.is_worker_running()));
}

#[test]
fn disposed_store_ignores_set_and_get() {
    let store = StateStore::new(TestState::default());
    store.set(|s| TestState { count: 1, ..s.clone() });
    settle(&store);

    store.dispose();
    store.set(|s| TestState { count: 2, ..s.clone() });
    let (tx, rx) = mpsc::channel::<i32>();
    store.get(move |s| tx.send(s.count).unwrap());

    assert!(rx.recv_timeout(std::time::Duration::from_millis(200)).is_err());
    assert_eq!(store.state().count, 1);
    assert!(wait_until(|| !store.is_worker_running()));
}

#[test]
fn subscription_dispose_stops_delivery() {
    let store = StateStore::new(TestState::default());
    let seen = Recorder::new();
    let sink = seen.sink();
    let sub = store.subscribe(move |s: &TestState| sink(s.count));

    sub.dispose();
    store.set(|s| TestState { count: 5, ..s.clone() });
    settle(&store);
    assert_eq!(seen.values(), vec![0]);
}
