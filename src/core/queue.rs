//! Closable blocking queue.
//!
//! [`ClosableQueue`] is the one synchronization primitive the rest of the crate
//! is built on: the alarm scheduler reads its requests from one, the worker pool
//! publishes results through one, and the one-shot futures behind sub-process
//! capture are one with a capacity of a single item.
//!
//! # Design
//!
//! - **One lock**: the buffered items and the closed flag live behind a single
//!   `parking_lot::Mutex`
//! - **No polling**: consumers park on a `readable` condvar, producers of a
//!   bounded queue park on a `writable` condvar
//! - **One-way close**: once closed, pushes fail and pops drain what is left,
//!   then report the end of the stream forever
//!
//! # Example
//!
//! ```
//! use prometheus_task_core::core::ClosableQueue;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(ClosableQueue::new());
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || {
//!         for i in 0..3 {
//!             queue.push(i);
//!         }
//!         queue.close();
//!     })
//! };
//!
//! let received: Vec<i32> = queue.iter().collect();
//! producer.join().unwrap();
//! assert_eq!(received, vec![0, 1, 2]);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// Outcome of [`ClosableQueue::pop_with_timeout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopResult<T> {
    /// An item was popped.
    Item(T),
    /// Nothing arrived before the timeout and the queue is still open.
    TimedOut,
    /// The queue is closed and fully drained.
    Closed,
}

impl<T> PopResult<T> {
    /// Returns `true` if the wait gave up because of the timeout.
    #[must_use]
    pub const fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// Returns `true` if the queue reported the end of the stream.
    #[must_use]
    pub const fn closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Converts into the popped item, if any.
    #[must_use]
    pub fn into_item(self) -> Option<T> {
        match self {
            Self::Item(item) => Some(item),
            Self::TimedOut | Self::Closed => None,
        }
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> QueueState<T> {
    fn is_readable(&self) -> bool {
        !self.items.is_empty() || self.closed
    }
}

/// Thread-safe FIFO with blocking pops, optional backpressure and a one-way close.
///
/// Any number of producers and consumers may share a queue (usually through an
/// `Arc`). Every pushed item is handed to exactly one consumer.
pub struct ClosableQueue<T> {
    state: Mutex<QueueState<T>>,
    readable: Condvar,
    writable: Condvar,
    max_len: Option<usize>,
}

impl<T> ClosableQueue<T> {
    /// Creates an unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_len(None)
    }

    /// Creates a queue whose producers block once `capacity` items are buffered.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, since no push could ever complete.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be greater than 0");
        Self::with_max_len(Some(capacity))
    }

    /// Creates a queue with an optional capacity bound.
    ///
    /// A bound of `Some(0)` is treated as `Some(1)`.
    #[must_use]
    pub fn with_max_len(max_len: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
            max_len: max_len.map(|n| n.max(1)),
        }
    }

    /// Appends an item, blocking while a bounded queue is full.
    ///
    /// Returns `false`, dropping `item`, if the queue is closed, including when
    /// it gets closed while this producer is blocked.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.state.lock();
        if let Some(max_len) = self.max_len {
            self.writable
                .wait_while(&mut state, |s| s.items.len() >= max_len && !s.closed);
        }
        if state.closed {
            return false;
        }
        state.items.push_back(item);
        self.readable.notify_one();
        true
    }

    /// Pops the next item, blocking until one arrives.
    ///
    /// Returns `None` only once the queue is closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        self.readable.wait_while(&mut state, |s| !s.is_readable());
        self.pop_locked(&mut state)
    }

    /// Pops the next item, giving up after `timeout`.
    ///
    /// Never reports [`PopResult::TimedOut`] before `timeout` has elapsed.
    pub fn pop_with_timeout(&self, timeout: Duration) -> PopResult<T> {
        let mut state = self.state.lock();
        let _ = self
            .readable
            .wait_while_for(&mut state, |s| !s.is_readable(), timeout);
        if let Some(item) = self.pop_locked(&mut state) {
            PopResult::Item(item)
        } else if state.closed {
            PopResult::Closed
        } else {
            PopResult::TimedOut
        }
    }

    /// Pops the next item if one is buffered. Never blocks.
    pub fn pop_non_blocking(&self) -> Option<T> {
        let mut state = self.state.lock();
        self.pop_locked(&mut state)
    }

    /// Blocks until the queue is readable.
    ///
    /// Returns `true` if an item is buffered, `false` if the queue is closed
    /// and drained. The item is not consumed, so another consumer may still
    /// take it first.
    pub fn wait_available(&self) -> bool {
        let mut state = self.state.lock();
        self.readable.wait_while(&mut state, |s| !s.is_readable());
        let available = !state.items.is_empty();
        if available {
            // This waiter may have absorbed a push notification meant for a
            // consumer; pass it on.
            self.readable.notify_one();
        }
        available
    }

    /// Closes the queue and wakes every blocked producer and consumer.
    ///
    /// Idempotent. Items already buffered stay poppable.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        debug!(remaining = state.items.len(), "queue closed");
        self.readable.notify_all();
        self.writable.notify_all();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns `true` if the queue is closed and nothing is left to pop.
    #[must_use]
    pub fn is_closed_and_empty(&self) -> bool {
        let state = self.state.lock();
        state.closed && state.items.is_empty()
    }

    /// Number of buffered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Capacity bound, if any.
    #[must_use]
    pub const fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    /// Lazy draining iterator; ends once the queue is closed and drained.
    ///
    /// Items taken by the iterator are gone, so iterating again resumes where
    /// the previous iteration stopped rather than starting over.
    pub const fn iter(&self) -> Drain<'_, T> {
        Drain { queue: self }
    }

    fn pop_locked(&self, state: &mut QueueState<T>) -> Option<T> {
        let item = state.items.pop_front();
        if item.is_some() {
            self.writable.notify_one();
        }
        item
    }
}

impl<T> Default for ClosableQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ClosableQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ClosableQueue")
            .field("len", &state.items.len())
            .field("closed", &state.closed)
            .field("max_len", &self.max_len)
            .finish()
    }
}

/// Iterator returned by [`ClosableQueue::iter`].
#[derive(Debug)]
pub struct Drain<'a, T> {
    queue: &'a ClosableQueue<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.pop()
    }
}

impl<T> FusedIterator for Drain<'_, T> {}

impl<'a, T> IntoIterator for &'a ClosableQueue<T> {
    type Item = T;
    type IntoIter = Drain<'a, T>;

    fn into_iter(self) -> Drain<'a, T> {
        self.iter()
    }
}
