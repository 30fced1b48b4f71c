//! A manual-reset event.
//!
//! Once signaled the event stays signaled until [`ManualResetEvent::reset`] is
//! called, so every current and future waiter is released. This is what lets a
//! thread that never touches a queue's lock observe that the queue finished.

use parking_lot::{Condvar, Mutex};

/// Level-triggered signal shared between threads
#[derive(Debug, Default)]
pub struct ManualResetEvent {
    signaled: Mutex<bool>,
    condition: Condvar,
}

impl ManualResetEvent {
    /// Create an event in the non-signaled state
    pub fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            condition: Condvar::new(),
        }
    }

    /// Set the event and release all waiters. Idempotent.
    pub fn signal(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.condition.notify_all();
    }

    /// Clear the event. Does not wake anyone.
    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    /// Block until the event is signaled; returns at once if it already is
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.condition.wait(&mut signaled);
        }
    }

    /// Check the current state without blocking
    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_signal_before_wait() {
        let event = ManualResetEvent::new();
        event.signal();
        event.wait();
        assert!(event.is_signaled());
    }

    #[test]
    fn test_signal_is_idempotent() {
        let event = ManualResetEvent::new();
        event.signal();
        event.signal();
        assert!(event.is_signaled());
        event.reset();
        assert!(!event.is_signaled());
    }

    #[test]
    fn test_single_signal_releases_all_waiters() {
        let event = Arc::new(ManualResetEvent::new());
        let released = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let event = Arc::clone(&event);
                let released = Arc::clone(&released);
                thread::spawn(move || {
                    event.wait();
                    released.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        assert_eq!(released.load(Ordering::SeqCst), 0);

        event.signal();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(released.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_wait_blocks_after_reset() {
        let event = Arc::new(ManualResetEvent::new());
        event.signal();
        event.reset();

        let (tx, rx) = crossbeam::channel::bounded(1);
        let waiter = {
            let event = Arc::clone(&event);
            thread::spawn(move || {
                event.wait();
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        event.signal();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        waiter.join().unwrap();
    }
}
