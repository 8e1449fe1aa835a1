use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Bounded multi-producer multi-consumer queue with close semantics.
///
/// Consumers block until a message arrives or the queue is closed;
/// producers must never outrun the bound (the BAI engine requests and
/// receives one-for-one, so at most one message per worker is in
/// flight).
pub struct ProdConQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
}

struct Inner<T> {
    queue: VecDeque<T>,
    capacity: usize,
    closed: bool,
}

impl<T> ProdConQueue<T> {
    pub fn new(capacity: usize) -> ProdConQueue<T> {
        ProdConQueue {
            inner: Mutex::new(Inner {
                queue: VecDeque::with_capacity(capacity),
                capacity,
                closed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Stop the queue: consumers drain what is left, then get `None`.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
        self.not_empty.notify_all();
    }

    /// The caller guarantees room; overrunning the bound or producing to
    /// a closed queue is a caller bug.
    pub fn produce(&self, message: T) {
        let mut inner = self.inner.lock().unwrap();
        assert!(!inner.closed, "produce to a closed queue");
        assert!(
            inner.queue.len() < inner.capacity,
            "queue unexpectedly full with {} messages",
            inner.queue.len()
        );
        inner.queue.push_back(message);
        drop(inner);
        self.not_empty.notify_one();
    }

    /// Block until a message is available; `None` once closed and empty.
    pub fn consume(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(message) = inner.queue.pop_front() {
                return Some(message);
            }
            if inner.closed {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }
}
