mod common;

use common::{channel_stream, wait_for_state, IterStream};
use statecraft::{Async, Disposable, MviError, MviState, ViewModel};
use std::sync::Arc;
use std::time::Duration;

/// Records every transition so tests can assert on the exact sequence even
/// when the store folds several of them into one publish.
#[derive(Debug, Clone, PartialEq, Default)]
struct Job<T> {
    history: Vec<Async<T>>,
    latest: Async<T>,
}

impl<T: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static> MviState for Job<T> {}

fn record<T: Clone>(state: &Job<T>, value: Async<T>) -> Job<T> {
    let mut history = state.history.clone();
    history.push(value.clone());
    Job {
        history,
        latest: value,
    }
}

#[tokio::test]
async fn future_goes_loading_then_success() {
    let vm = ViewModel::<Job<i32>>::new(Job::default());
    vm.execute(async { Ok::<_, anyhow::Error>(42) }, record)
        .unwrap();

    let state = wait_for_state(&vm, |s| s.latest.is_complete()).await;
    assert_eq!(state.history, vec![Async::loading(), Async::success(42)]);
}

#[tokio::test]
async fn future_error_becomes_fail() {
    let vm = ViewModel::<Job<i32>>::new(Job::default());
    vm.execute(async { Err::<i32, _>(anyhow::anyhow!("unreachable host")) }, record)
        .unwrap();

    let state = wait_for_state(&vm, |s| s.latest.is_complete()).await;
    assert_eq!(state.history.len(), 2);
    assert!(state.history[0].is_loading());
    let error = state.latest.error().expect("fail carries an error");
    assert_eq!(error.to_string(), "unreachable host");
}

#[tokio::test]
async fn mapped_future_stores_mapped_value() {
    let vm = ViewModel::<Job<usize>>::new(Job::default());
    vm.execute_mapped(
        async { Ok::<_, std::io::Error>("hello") },
        |text: &str| text.len(),
        record,
    )
    .unwrap();

    let state = wait_for_state(&vm, |s| s.latest.is_complete()).await;
    assert_eq!(state.latest.value(), Some(&5));
}

#[tokio::test]
async fn stream_emits_success_per_item() {
    let vm = ViewModel::<Job<&'static str>>::new(Job::default());
    let items = IterStream::new(vec![Ok::<_, anyhow::Error>("a"), Ok("b")]);
    let handle = vm.execute_stream(items, record).unwrap();

    let state = wait_for_state(&vm, |s| s.history.len() == 3).await;
    assert_eq!(
        state.history,
        vec![Async::loading(), Async::success("a"), Async::success("b")]
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(handle.is_finished());
}

#[tokio::test]
async fn stream_error_stops_processing() {
    let vm = ViewModel::<Job<i32>>::new(Job::default());
    let items = IterStream::new(vec![
        Ok(1),
        Err(anyhow::anyhow!("broken pipe")),
        Ok(3),
    ]);
    let handle = vm.execute_stream(items, record).unwrap();

    let state = wait_for_state(&vm, |s| s.latest.is_fail()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let state = vm.await_state().await.unwrap_or(state);

    assert_eq!(state.history.len(), 3);
    assert_eq!(state.history[1], Async::success(1));
    assert!(state.history[2].is_fail());
    assert!(handle.is_finished());
}

#[tokio::test]
async fn stream_success_carries_metadata() {
    let vm = ViewModel::<Job<i32>>::new(Job::default());
    let items = IterStream::new(vec![Ok::<_, anyhow::Error>(7)]);
    vm.execute_stream_with(
        items,
        |value: i32| value * 10,
        |value: &i32| Some(Arc::new(format!("raw={value}")) as statecraft::Metadata),
        record,
    )
    .unwrap();

    let state = wait_for_state(&vm, |s| s.latest.is_success()).await;
    assert_eq!(state.latest.value(), Some(&70));
    assert_eq!(
        state.latest.metadata::<String>().map(String::as_str),
        Some("raw=7")
    );
}

#[tokio::test]
async fn cancel_prevents_further_updates() {
    let vm = ViewModel::<Job<i32>>::new(Job::default());
    let (tx, stream) = channel_stream::<anyhow::Result<i32>>();
    let handle = vm.execute_stream(stream, record).unwrap();

    tx.send(Ok(1)).unwrap();
    wait_for_state(&vm, |s| s.latest == Async::success(1)).await;

    handle.cancel();
    let _ = tx.send(Ok(2));
    tokio::time::sleep(Duration::from_millis(30)).await;

    let state = vm.await_state().await.unwrap();
    assert_eq!(state.history, vec![Async::loading(), Async::success(1)]);
    assert!(handle.is_cancelled());
    assert!(handle.is_disposed());
}

#[tokio::test]
async fn cancel_discards_results_still_queued_on_the_worker() {
    let vm = ViewModel::<Job<i32>>::new(Job::default());
    let (tx, stream) = channel_stream::<anyhow::Result<i32>>();
    let handle = vm.execute_stream(stream, record).unwrap();
    wait_for_state(&vm, |s| s.latest.is_loading()).await;

    vm.with_state(|_| std::thread::sleep(Duration::from_millis(300)));
    tx.send(Ok(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();

    let state = vm.await_state().await.unwrap();
    assert_eq!(state.history, vec![Async::loading()]);
}

#[tokio::test]
async fn finished_execution_counts_as_disposed() {
    let vm = ViewModel::<Job<i32>>::new(Job::default());
    let handle = vm
        .execute(async { Ok::<_, anyhow::Error>(7) }, record)
        .unwrap();

    wait_for_state(&vm, |s| s.latest.is_complete()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(handle.is_finished());
    assert!(!handle.is_cancelled());
    assert!(handle.is_disposed());
}

#[tokio::test]
async fn clear_cancels_running_executions() {
    let vm = ViewModel::<Job<i32>>::new(Job::default());
    let (_tx, stream) = channel_stream::<anyhow::Result<i32>>();
    let handle = vm.execute_stream(stream, record).unwrap();

    vm.clear();
    assert!(handle.is_cancelled());
}

#[test]
fn execute_without_runtime_is_an_error() {
    let vm = ViewModel::<Job<i32>>::new(Job::default());
    let result = vm.execute(async { Ok::<_, anyhow::Error>(1) }, record);
    assert!(matches!(result, Err(MviError::NoRuntime)));
}
