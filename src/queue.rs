use crate::error::{PipelineError, PutError, Result};
use crate::event::ManualResetEvent;
use parking_lot::{Condvar, Mutex};

/// Ring buffer state, only ever touched under the queue's lock
#[derive(Debug)]
struct QueueState<T> {
    slots: Vec<Option<T>>,
    count: usize,
    head: usize,
    tail: usize,
    finished: bool,
}

/// A fixed-capacity blocking FIFO with a one-way finished latch.
///
/// One mutex guards all state and one condition variable serves both
/// producers waiting for space and consumers waiting for items. Every state
/// change broadcasts so neither side can miss a wakeup meant for it.
///
/// A capacity-0 queue never blocks: `put` is rejected and `get` returns
/// `None` straight away.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    capacity: usize,
    state: Mutex<QueueState<T>>,
    condition: Condvar,
    finished_event: ManualResetEvent,
}

impl<T> BoundedQueue<T> {
    /// Create a queue with room for `capacity` items
    pub fn new(capacity: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| PipelineError::AllocationFailed { capacity })?;
        slots.resize_with(capacity, || None);

        Ok(Self {
            capacity,
            state: Mutex::new(QueueState {
                slots,
                count: 0,
                head: 0,
                tail: 0,
                finished: false,
            }),
            condition: Condvar::new(),
            finished_event: ManualResetEvent::new(),
        })
    }

    /// Enqueue an item, blocking while the queue is full.
    ///
    /// Fails without blocking on a zero-capacity or already finished queue,
    /// and fails if the queue finishes while this call waits for space.
    /// A rejected item is returned inside the error.
    pub fn put(&self, item: T) -> std::result::Result<(), PutError<T>> {
        if self.capacity == 0 {
            return Err(PutError::ZeroCapacity(item));
        }

        let mut state = self.state.lock();
        while state.count == self.capacity && !state.finished {
            self.condition.wait(&mut state);
        }
        if state.finished {
            return Err(PutError::Finished(item));
        }

        let tail = state.tail;
        state.slots[tail] = Some(item);
        state.tail = (tail + 1) % self.capacity;
        state.count += 1;
        self.condition.notify_all();
        Ok(())
    }

    /// Dequeue the oldest item, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is finished and drained, or immediately
    /// for a zero-capacity queue.
    pub fn get(&self) -> Option<T> {
        if self.capacity == 0 {
            return None;
        }

        let mut state = self.state.lock();
        while state.count == 0 && !state.finished {
            self.condition.wait(&mut state);
        }
        if state.count == 0 {
            return None;
        }

        let head = state.head;
        let item = state.slots[head].take();
        state.head = (head + 1) % self.capacity;
        state.count -= 1;
        self.condition.notify_all();
        item
    }

    /// Latch the queue as finished and release every blocked `put`/`get`.
    ///
    /// Also signals the finished event so [`wait_finished`](Self::wait_finished)
    /// callers, who never take the queue lock, are released too. Idempotent.
    pub fn signal_finished(&self) {
        {
            let mut state = self.state.lock();
            state.finished = true;
            self.condition.notify_all();
        }
        self.finished_event.signal();
    }

    /// Block until the queue has been marked finished. Items may remain buffered.
    pub fn wait_finished(&self) {
        self.finished_event.wait();
    }

    /// Finish the queue and discard whatever is still buffered.
    ///
    /// Returns the number of items that were discarded.
    pub fn destroy(&self) -> usize {
        self.signal_finished();

        let mut state = self.state.lock();
        let mut discarded = 0;
        for slot in state.slots.iter_mut() {
            if slot.take().is_some() {
                discarded += 1;
            }
        }
        state.count = 0;
        state.head = 0;
        state.tail = 0;
        discarded
    }

    /// Get the capacity of the queue
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of buffered items
    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether the finished latch is set
    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }
}
