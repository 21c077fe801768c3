mod common;

use common::{settle_vm, Recorder, TestState};
use statecraft::{
    with_state, with_state2, Async, Disposable, Lifecycle, LifecycleState, MviError, ViewModel,
};

fn bump(vm: &ViewModel<TestState>) {
    vm.set_state(|s| TestState { count: s.count + 1, ..s.clone() });
}

#[test]
fn selector_ignores_unrelated_changes() {
    let vm = ViewModel::<TestState>::new(TestState::default());
    let counts = Recorder::new();
    vm.select_subscribe(None, |s: &TestState| s.count, counts.sink())
        .unwrap();

    vm.set_state(|s| TestState { label: "x".into(), ..s.clone() });
    vm.set_state(|s| TestState { flag: true, ..s.clone() });
    settle_vm(&vm);
    bump(&vm);
    settle_vm(&vm);

    assert_eq!(counts.values(), vec![0, 1]);
}

#[test]
fn multi_property_selectors_fire_when_any_changes() {
    let vm = ViewModel::<TestState>::new(TestState::default());
    let pairs = Recorder::new();
    let sink = pairs.sink();
    vm.select_subscribe2(
        None,
        |s: &TestState| s.count,
        |s: &TestState| s.flag,
        move |count, flag| sink((count, flag)),
    )
    .unwrap();

    let triples = Recorder::new();
    let sink = triples.sink();
    vm.select_subscribe3(
        None,
        |s: &TestState| s.count,
        |s: &TestState| s.flag,
        |s: &TestState| s.label.clone(),
        move |count, flag, label| sink((count, flag, label)),
    )
    .unwrap();

    let quads = Recorder::new();
    let sink = quads.sink();
    vm.select_subscribe4(
        None,
        |s: &TestState| s.count,
        |s: &TestState| s.flag,
        |s: &TestState| s.label.len(),
        |s: &TestState| s.count * 2,
        move |a, b, c, d| sink((a, b, c, d)),
    )
    .unwrap();

    vm.set_state(|s| TestState { flag: true, ..s.clone() });
    settle_vm(&vm);
    vm.set_state(|s| TestState { label: "abc".into(), ..s.clone() });
    settle_vm(&vm);

    assert_eq!(pairs.values(), vec![(0, false), (0, true)]);
    assert_eq!(triples.len(), 3);
    assert_eq!(quads.values(), vec![(0, false, 0, 0), (0, true, 0, 0), (0, true, 3, 0)]);
}

#[test]
fn locked_owner_buffers_and_delivers_latest_once() {
    let vm = ViewModel::<TestState>::new(TestState::default());
    let lifecycle = Lifecycle::with_state(LifecycleState::Created);
    let counts = Recorder::new();
    vm.select_subscribe(Some(&lifecycle), |s: &TestState| s.count, counts.sink())
        .unwrap();

    for _ in 0..3 {
        bump(&vm);
        settle_vm(&vm);
    }
    assert!(counts.values().is_empty());

    lifecycle.move_to(LifecycleState::Started);
    assert_eq!(counts.values(), vec![3]);

    lifecycle.move_to(LifecycleState::Resumed);
    assert_eq!(counts.values(), vec![3]);
}

#[test]
fn reactivated_owner_gets_latest_state_again() {
    let vm = ViewModel::<TestState>::new(TestState::default());
    let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
    let counts = Recorder::new();
    vm.select_subscribe(Some(&lifecycle), |s: &TestState| s.count, counts.sink())
        .unwrap();
    bump(&vm);
    settle_vm(&vm);

    lifecycle.move_to(LifecycleState::Created);
    lifecycle.move_to(LifecycleState::Resumed);
    assert_eq!(counts.values(), vec![0, 1, 1]);
}

#[test]
fn no_delivery_after_owner_destroyed() {
    let vm = ViewModel::<TestState>::new(TestState::default());
    let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
    let counts = Recorder::new();
    let sub = vm
        .select_subscribe(Some(&lifecycle), |s: &TestState| s.count, counts.sink())
        .unwrap();

    lifecycle.move_to(LifecycleState::Destroyed);
    assert!(sub.is_disposed());

    bump(&vm);
    settle_vm(&vm);
    assert_eq!(counts.values(), vec![0]);
    assert_eq!(lifecycle.observer_count(), 0);
}

#[test]
fn value_buffered_while_locked_is_dropped_when_owner_is_destroyed() {
    let vm = ViewModel::<TestState>::new(TestState::default());
    let lifecycle = Lifecycle::with_state(LifecycleState::Created);
    let counts = Recorder::new();
    let sub = vm
        .select_subscribe(Some(&lifecycle), |s: &TestState| s.count, counts.sink())
        .unwrap();

    bump(&vm);
    settle_vm(&vm);
    assert!(counts.values().is_empty());

    lifecycle.move_to(LifecycleState::Destroyed);
    assert!(sub.is_disposed());
    bump(&vm);
    settle_vm(&vm);

    lifecycle.move_to(LifecycleState::Resumed);
    assert!(lifecycle.is_destroyed());
    assert!(counts.values().is_empty());
    assert_eq!(lifecycle.observer_count(), 0);
}

#[test]
fn subscribing_to_destroyed_owner_fails() {
    let vm = ViewModel::<TestState>::new(TestState::default());
    let lifecycle = Lifecycle::with_state(LifecycleState::Destroyed);
    let result = vm.subscribe(Some(&lifecycle), |_| {});
    assert!(matches!(result, Err(MviError::LifecycleDestroyed)));
}

#[test]
fn async_subscribe_routes_success_and_failure() {
    #[derive(Debug, Clone, PartialEq, Default)]
    struct Loadable {
        data: Async<i32>,
    }
    impl statecraft::MviState for Loadable {}

    let vm = ViewModel::<Loadable>::new(Loadable::default());
    let successes = Recorder::new();
    let failures = Recorder::new();
    let fail_sink = failures.sink();
    vm.async_subscribe(
        None,
        |s: &Loadable| s.data.clone(),
        move |error| fail_sink(error.to_string()),
        successes.sink(),
    )
    .unwrap();

    vm.set_state(|_| Loadable { data: Async::loading() });
    settle_vm(&vm);
    vm.set_state(|_| Loadable { data: Async::success(7) });
    settle_vm(&vm);
    let error = statecraft::AsyncError::new(anyhow::anyhow!("boom"));
    vm.set_state(move |_| Loadable {
        data: Async::Fail { error: error.clone(), value: None },
    });
    settle_vm(&vm);

    assert_eq!(successes.values(), vec![7]);
    assert_eq!(failures.values(), vec!["boom".to_string()]);
}

#[test]
fn synchronous_reads_of_one_and_two_view_models() {
    let first = ViewModel::<TestState>::new(TestState::default());
    let second = ViewModel::<TestState>::new(TestState { count: 40, ..TestState::default() });
    bump(&first);
    bump(&first);
    settle_vm(&first);

    assert_eq!(with_state(&first, |s| s.count), 2);
    assert_eq!(with_state2(&first, &second, |a, b| a.count + b.count), 42);
}

#[test]
fn clear_disposes_subscriptions_and_rejects_new_ones() {
    let vm = ViewModel::<TestState>::new(TestState::default());
    let sub = vm.subscribe(None, |_| {}).unwrap();
    let extra = vm.dispose_on_clear(statecraft::Subscription::from_fn(|| {}));

    vm.clear();
    vm.clear();

    assert!(vm.is_cleared());
    assert!(sub.is_disposed());
    assert!(extra.is_disposed());
    assert!(vm.store().is_disposed());
    assert!(matches!(vm.subscribe(None, |_| {}), Err(MviError::Disposed)));
}

#[tokio::test]
async fn await_state_resolves_after_pending_writes() {
    let vm = ViewModel::<TestState>::new(TestState::default());
    bump(&vm);
    bump(&vm);
    assert_eq!(vm.await_state().await.unwrap().count, 2);

    vm.clear();
    assert!(matches!(vm.await_state().await, Err(MviError::Disposed)));
}

#[test]
fn store_failure_surfaces_on_subscribe() {
    let vm = ViewModel::<TestState>::new(TestState::default());
    vm.set_state(|_| panic!("bad reducer"));
    assert!(common::wait_until(|| vm.store().failure().is_some()));
    assert!(matches!(vm.subscribe(None, |_| {}), Err(MviError::Store(_))));
}
