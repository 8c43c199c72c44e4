//! Fixed-capacity FIFO shared between one or more producers and a single
//! consumer thread.
//!
//! # How the queue is used (for beginners)
//!
//! The control channel and the recorder each own a worker thread that waits
//! for items and writes them somewhere slow (a socket, a file). Other threads
//! hand items over through a `BoundedQueue`:
//!
//! - **Producers** call [`BoundedQueue::try_push`]. It never blocks: when the
//!   queue is full or shut down the item is handed back so the caller can
//!   decide what to do with it.
//! - **The consumer** calls [`BoundedQueue::blocking_take`], which sleeps on a
//!   condition variable until an item arrives or shutdown is signalled.
//!
//! # Shutdown
//!
//! [`BoundedQueue::signal_shutdown`] lets the consumer drain what is already
//! queued and only then report [`QueueClosed`]. [`BoundedQueue::close_and_discard`]
//! drops everything still queued, for channels that must stop promptly.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

use thiserror::Error;
use tracing::trace;

/// Returned by [`BoundedQueue::blocking_take`] once the queue is shut down and empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is shut down")]
pub struct QueueClosed;

struct State<T> {
    items: VecDeque<T>,
    shutdown: bool,
}

/// A mutex-protected ring of at most `capacity` items.
///
/// # Examples
///
/// ```rust
/// use scrmirror_core::sync::BoundedQueue;
///
/// let queue = BoundedQueue::new(2);
/// assert!(queue.try_push(1).is_ok());
/// assert!(queue.try_push(2).is_ok());
/// assert_eq!(queue.try_push(3), Err(3));
/// assert_eq!(queue.blocking_take(), Ok(1));
/// ```
pub struct BoundedQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue.
    ///
    /// A capacity of zero is bumped to one so the queue can hold something.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Appends `item` unless the queue is full or shut down.
    ///
    /// # Errors
    ///
    /// Returns the item back to the caller when it was not accepted.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.shutdown || state.items.len() >= self.capacity {
            return Err(item);
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Waits until an item is available and removes it.
    ///
    /// Items queued before shutdown are still returned; only an empty, shut
    /// down queue yields [`QueueClosed`].
    pub fn blocking_take(&self) -> Result<T, QueueClosed> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Ok(item);
            }
            if state.shutdown {
                return Err(QueueClosed);
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Removes the oldest item without waiting.
    pub fn try_take(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Rejects further pushes and wakes the consumer. Queued items stay.
    pub fn signal_shutdown(&self) {
        self.lock().shutdown = true;
        self.not_empty.notify_all();
    }

    /// Shuts the queue down and drops every queued item.
    ///
    /// Returns the number of items discarded.
    pub fn close_and_discard(&self) -> usize {
        let discarded = {
            let mut state = self.lock();
            state.shutdown = true;
            let discarded = state.items.len();
            state.items.clear();
            discarded
        };
        self.not_empty.notify_all();
        if discarded > 0 {
            trace!(discarded, "queue closed with pending items");
        }
        discarded
    }

    /// Drops every queued item without changing the shutdown state.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let discarded = state.items.len();
        state.items.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    // A panicking producer must not wedge the consumer, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
