mod common;

use common::{settle_vm, Recorder, TestState};
use statecraft::{Disposable, Lifecycle, LifecycleState, MainLoop, ViewModel};
use std::time::Duration;

fn view_model() -> ViewModel<TestState, String> {
    ViewModel::new(TestState::default())
}

#[test]
fn messages_sent_before_subscribing_arrive_on_first_subscription() {
    let vm = view_model();
    vm.send_message("first".into());
    vm.send_message("second".into());

    let lifecycle = Lifecycle::with_state(LifecycleState::Created);
    let seen = Recorder::new();
    vm.subscribe_messages(Some(&lifecycle), seen.sink()).unwrap();
    assert!(seen.values().is_empty());

    lifecycle.move_to(LifecycleState::Started);
    assert_eq!(seen.values(), vec!["first".to_string(), "second".to_string()]);
}

#[test]
fn stopped_subscriber_gets_backlog_on_restart() {
    let vm = view_model();
    let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
    let seen = Recorder::new();
    vm.subscribe_messages(Some(&lifecycle), seen.sink()).unwrap();

    vm.send_message("live".into());
    lifecycle.move_to(LifecycleState::Created);
    vm.send_message("queued".into());
    assert_eq!(seen.values(), vec!["live".to_string()]);

    lifecycle.move_to(LifecycleState::Resumed);
    assert_eq!(seen.values(), vec!["live".to_string(), "queued".to_string()]);
}

#[test]
fn each_message_is_delivered_once() {
    let vm = view_model();
    let first = Recorder::new();
    vm.subscribe_messages(None, first.sink()).unwrap();
    vm.send_message("hello".into());

    let second = Recorder::new();
    vm.subscribe_messages(None, second.sink()).unwrap();
    assert_eq!(first.values(), vec!["hello".to_string()]);
    assert!(second.values().is_empty());
}

#[test]
fn destroyed_subscriber_receives_nothing_more() {
    let vm = view_model();
    let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
    let seen = Recorder::new();
    let sub = vm.subscribe_messages(Some(&lifecycle), seen.sink()).unwrap();

    lifecycle.move_to(LifecycleState::Destroyed);
    vm.send_message("late".into());
    assert!(sub.is_disposed());
    assert!(seen.values().is_empty());
}

#[test]
fn main_loop_delivery_waits_for_the_owning_thread() {
    let main_loop = MainLoop::new();
    let vm = ViewModel::<TestState, String>::builder(TestState::default())
        .dispatcher(main_loop.dispatcher())
        .build();
    let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);

    let messages = Recorder::new();
    vm.subscribe_messages(Some(&lifecycle), messages.sink()).unwrap();
    let counts = Recorder::new();
    vm.select_subscribe(Some(&lifecycle), |s: &TestState| s.count, counts.sink())
        .unwrap();

    vm.send_message("toast".into());
    vm.set_state(|s| TestState { count: 3, ..s.clone() });
    settle_vm(&vm);
    assert!(messages.values().is_empty());
    assert!(counts.values().is_empty());

    main_loop.run_for(Duration::from_millis(100));
    assert_eq!(messages.values(), vec!["toast".to_string()]);
    assert_eq!(counts.values(), vec![0, 3]);
}

fn main_loop_view_model(main_loop: &MainLoop) -> ViewModel<TestState, String> {
    ViewModel::<TestState, String>::builder(TestState::default())
        .dispatcher(main_loop.dispatcher())
        .build()
}

#[test]
fn queued_message_waits_for_restart_when_owner_stops_before_drain() {
    let main_loop = MainLoop::new();
    let vm = main_loop_view_model(&main_loop);
    let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
    let messages = Recorder::new();
    vm.subscribe_messages(Some(&lifecycle), messages.sink()).unwrap();

    vm.send_message("toast".into());
    settle_vm(&vm);
    lifecycle.move_to(LifecycleState::Created);
    main_loop.run_pending();
    assert!(messages.values().is_empty());

    vm.send_message("snackbar".into());
    settle_vm(&vm);
    lifecycle.move_to(LifecycleState::Resumed);
    main_loop.run_pending();
    assert_eq!(
        messages.values(),
        vec!["toast".to_string(), "snackbar".to_string()]
    );
}

#[test]
fn queued_message_is_dropped_when_owner_is_destroyed_before_drain() {
    let main_loop = MainLoop::new();
    let vm = main_loop_view_model(&main_loop);
    let lifecycle = Lifecycle::with_state(LifecycleState::Resumed);
    let messages = Recorder::new();
    let sub = vm.subscribe_messages(Some(&lifecycle), messages.sink()).unwrap();
    let counts = Recorder::new();
    vm.select_subscribe(Some(&lifecycle), |s: &TestState| s.count, counts.sink())
        .unwrap();
    main_loop.run_pending();

    vm.send_message("toast".into());
    vm.set_state(|s| TestState { count: 1, ..s.clone() });
    settle_vm(&vm);
    lifecycle.move_to(LifecycleState::Destroyed);
    main_loop.run_pending();

    assert!(sub.is_disposed());
    assert!(messages.values().is_empty());
    assert_eq!(counts.values(), vec![0]);
}
