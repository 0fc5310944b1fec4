//! Pre-sized work queue drained through a shared atomic cursor.
//!
//! [`PopQueue`] is built once from a finite, already materialized sequence.
//! Each [`pop`](PopQueue::pop) claims the next index with a single `fetch_add`,
//! so no two callers ever receive the same element and no queue-wide lock is
//! taken. The per-slot mutex only exists to move the claimed element out
//! safely; it is never contended because its index belongs to one caller.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Lock-free claim queue over a fixed sequence of elements.
pub struct PopQueue<T> {
    slots: Box<[Mutex<Option<T>>]>,
    head: AtomicUsize,
}

impl<T> PopQueue<T> {
    /// Creates a queue holding `items` in order.
    pub fn new(items: impl Into<Vec<T>>) -> Self {
        let slots = items
            .into()
            .into_iter()
            .map(|item| Mutex::new(Some(item)))
            .collect();
        Self {
            slots,
            head: AtomicUsize::new(0),
        }
    }

    /// Claims the next element, or returns `None` once every element is claimed.
    pub fn pop(&self) -> Option<T> {
        let idx = self.head.fetch_add(1, Ordering::Relaxed);
        self.slots.get(idx)?.lock().take()
    }

    /// Total number of elements the queue was built with.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` once every element has been claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Number of elements claimed so far.
    #[must_use]
    pub fn claimed(&self) -> usize {
        self.head.load(Ordering::Relaxed).min(self.slots.len())
    }

    /// Number of elements not yet claimed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.slots.len() - self.claimed()
    }

    /// Lazy iterator that keeps claiming elements until none are left.
    pub const fn iter(&self) -> Claims<'_, T> {
        Claims { queue: self }
    }
}

impl<T> FromIterator<T> for PopQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T> fmt::Debug for PopQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopQueue")
            .field("len", &self.len())
            .field("claimed", &self.claimed())
            .finish()
    }
}

/// Iterator returned by [`PopQueue::iter`].
#[derive(Debug)]
pub struct Claims<'a, T> {
    queue: &'a PopQueue<T>,
}

impl<T> Iterator for Claims<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.pop()
    }
}

impl<T> FusedIterator for Claims<'_, T> {}
