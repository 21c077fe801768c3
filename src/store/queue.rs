//! Pending read and write buffers for a state store.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A read request: runs once with the state after all earlier writes.
pub type ReadBlock<S> = Box<dyn FnOnce(&S) + Send + 'static>;

/// A state transition. `Fn` rather than `FnOnce` so debug mode can apply it
/// twice and compare the results.
pub type WriteReducer<S> = Box<dyn Fn(&S) -> S + Send + 'static>;

/// Thread-safe FIFO buffers of pending reads and writes.
///
/// Producers on any thread append; only the worker removes. Each operation
/// holds its buffer's lock for O(1) work, so callers never wait on reducer
/// execution.
pub struct MutationQueue<S> {
    reads: Mutex<VecDeque<ReadBlock<S>>>,
    writes: Mutex<Vec<WriteReducer<S>>>,
}

impl<S> MutationQueue<S> {
    pub fn new() -> Self {
        Self {
            reads: Mutex::new(VecDeque::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn enqueue_read(&self, block: ReadBlock<S>) {
        self.reads.lock().push_back(block);
    }

    pub fn enqueue_write(&self, reducer: WriteReducer<S>) {
        self.writes.lock().push(reducer);
    }

    /// Remove the oldest pending read.
    pub fn dequeue_read(&self) -> Option<ReadBlock<S>> {
        self.reads.lock().pop_front()
    }

    /// Take every pending write in submission order.
    ///
    /// Returns `None` without allocating when nothing is pending.
    pub fn drain_writes(&self) -> Option<Vec<WriteReducer<S>>> {
        let mut writes = self.writes.lock();
        if writes.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut *writes))
    }

    pub fn pending_reads(&self) -> usize {
        self.reads.lock().len()
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.lock().len()
    }

    /// Drop everything still queued.
    pub fn clear(&self) {
        // Release the closures outside the locks; their captures may do work on drop.
        let reads = std::mem::take(&mut *self.reads.lock());
        let writes = std::mem::take(&mut *self.writes.lock());
        drop(reads);
        drop(writes);
    }
}

impl<S> Default for MutationQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}
