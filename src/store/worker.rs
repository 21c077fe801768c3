//! The serialized state worker.
//!
//! One named OS thread per store, fed by an mpsc run queue. It is the only
//! place reducers are applied and read blocks are run.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::error::{panic_message, StoreError};
use crate::mvi::MviState;
use crate::store::checker::{apply_checked, MutableStateChecker};
use crate::store::queue::MutationQueue;
use crate::store::stream::StateStream;

/// Messages on the worker's run queue.
pub(crate) enum Command {
    /// Process everything pending in the mutation queue.
    Flush,
    /// A background check failed; stop the store.
    Fail(StoreError),
    Shutdown,
}

/// State shared between the store handles and the worker thread.
pub(crate) struct Shared<S> {
    pub(crate) queue: MutationQueue<S>,
    pub(crate) stream: StateStream<S>,
    pub(crate) disposed: AtomicBool,
    pub(crate) running: AtomicBool,
    pub(crate) failure: Mutex<Option<StoreError>>,
    debug_mode: bool,
}

impl<S: MviState> Shared<S> {
    pub(crate) fn new(initial: S, debug_mode: bool) -> Self {
        Self {
            queue: MutationQueue::new(),
            stream: StateStream::new(initial),
            disposed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            failure: Mutex::new(None),
            debug_mode,
        }
    }

    /// Drain writes, run one read, repeat until both buffers are empty.
    ///
    /// Re-draining after every read is what guarantees that a read observes
    /// every write enqueued before it, even writes that arrived while an
    /// earlier read was running.
    fn flush(&self, checker: &mut Option<MutableStateChecker<S>>) -> Result<(), StoreError> {
        loop {
            self.apply_writes(checker)?;
            let Some(block) = self.queue.dequeue_read() else {
                return Ok(());
            };
            let state = self.stream.value();
            block(&state);
        }
    }

    fn apply_writes(&self, checker: &mut Option<MutableStateChecker<S>>) -> Result<(), StoreError> {
        let Some(reducers) = self.queue.drain_writes() else {
            return Ok(());
        };
        let current = self.stream.value();
        let mut state = current.clone();
        for reducer in &reducers {
            state = if self.debug_mode {
                apply_checked(&state, reducer)?
            } else {
                reducer(&state)
            };
        }
        drop(reducers);

        if state == current {
            return Ok(());
        }
        if let Some(checker) = checker.as_mut() {
            checker.on_state_changed(&state)?;
        }
        self.stream.publish(state);
        Ok(())
    }

    pub(crate) fn record_failure(&self, error: StoreError) {
        tracing::error!(error = %error, "state store failed");
        {
            let mut failure = self.failure.lock();
            if failure.is_none() {
                *failure = Some(error);
            }
        }
        self.disposed.store(true, Ordering::SeqCst);
        self.queue.clear();
    }
}

/// Start the worker thread.
pub(crate) fn spawn<S: MviState>(
    name: &str,
    shared: Arc<Shared<S>>,
    rx: Receiver<Command>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || run(shared, rx))
}

fn run<S: MviState>(shared: Arc<Shared<S>>, rx: Receiver<Command>) {
    let shared = scopeguard::guard(shared, |shared| {
        shared.running.store(false, Ordering::SeqCst);
        tracing::debug!("state worker stopped");
    });
    tracing::debug!("state worker started");

    let mut checker = if shared.debug_mode {
        Some(MutableStateChecker::new(&shared.stream.value()))
    } else {
        None
    };

    while let Ok(command) = rx.recv() {
        match command {
            Command::Flush => {
                if shared.disposed.load(Ordering::SeqCst) {
                    break;
                }
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.flush(&mut checker)));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => {
                        shared.record_failure(error);
                        break;
                    }
                    Err(payload) => {
                        shared.record_failure(StoreError::WorkerPanicked {
                            message: panic_message(payload.as_ref()),
                        });
                        break;
                    }
                }
            }
            Command::Fail(error) => {
                shared.record_failure(error);
                break;
            }
            Command::Shutdown => break,
        }
    }
}
