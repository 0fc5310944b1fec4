//! One-shot futures and the background threads that fulfil them.
//!
//! A one-shot is a [`ClosableQueue`] with room for a single item: the sender
//! pushes once and closes, so the receiver either gets the value or learns that
//! the sender went away without producing one.
//!
//! [`BackgroundTask`] pairs a named OS thread with a one-shot carrying the
//! thread's return value. It is the building block for the alarm scheduler
//! thread, the worker pool's join thread and the sub-process capture/feed
//! threads.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error};

use super::error::TaskError;
use super::queue::{ClosableQueue, PopResult};

/// Creates a connected one-shot sender/receiver pair.
#[must_use]
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let slot = Arc::new(ClosableQueue::bounded(1));
    (
        Sender {
            slot: Arc::clone(&slot),
        },
        Receiver { slot },
    )
}

/// Producing half of a one-shot. Dropping it unsent closes the channel.
pub struct Sender<T> {
    slot: Arc<ClosableQueue<T>>,
}

impl<T> Sender<T> {
    /// Publishes the value. Returns `false` if the receiver is gone.
    pub fn send(self, value: T) -> bool {
        self.slot.push(value)
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.slot.close();
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}

/// Consuming half of a one-shot.
pub struct Receiver<T> {
    slot: Arc<ClosableQueue<T>>,
}

impl<T> Receiver<T> {
    /// Blocks until the value arrives; `None` if the sender was dropped unsent.
    pub fn recv(self) -> Option<T> {
        self.slot.pop()
    }

    /// Waits up to `timeout` for the value.
    pub fn recv_timeout(&self, timeout: Duration) -> PopResult<T> {
        self.slot.pop_with_timeout(timeout)
    }

    /// Takes the value if it has already been sent.
    pub fn try_recv(&self) -> Option<T> {
        self.slot.pop_non_blocking()
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.slot.close();
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("ready", &!self.slot.is_empty())
            .finish()
    }
}

/// A named OS thread whose return value is delivered through a one-shot.
///
/// The thread is always joined by its owner: explicitly through
/// [`join`](Self::join) / [`wait`](Self::wait), or by `Drop` otherwise.
pub struct BackgroundTask<T> {
    name: String,
    thread: Option<JoinHandle<()>>,
    result: Option<Receiver<T>>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    /// Spawns `f` on a new thread called `name`.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Spawn` if the OS refuses to create the thread.
    pub fn spawn<F>(name: impl Into<String>, f: F) -> Result<Self, TaskError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = channel();
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            tx.send(f());
        });
        let thread = match spawned {
            Ok(thread) => thread,
            Err(source) => return Err(TaskError::Spawn { name, source }),
        };
        debug!(thread = %name, "background task started");
        Ok(Self {
            name,
            thread: Some(thread),
            result: Some(rx),
        })
    }
}

impl<T> BackgroundTask<T> {
    /// Joins the thread and returns its value.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Panicked` if the closure panicked.
    pub fn join(mut self) -> Result<T, TaskError> {
        self.wait()
    }

    /// Joins the thread and takes its value, leaving the task spent.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Panicked` if the closure panicked and
    /// `TaskError::AlreadyTaken` if the value was taken before.
    pub fn wait(&mut self) -> Result<T, TaskError> {
        let Some(result) = self.result.take() else {
            return Err(TaskError::AlreadyTaken);
        };
        self.join_thread()?;
        result
            .recv()
            .ok_or_else(|| TaskError::Panicked(self.name.clone()))
    }

    /// Thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` once the thread has returned (or was already joined).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    fn join_thread(&mut self) -> Result<(), TaskError> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| TaskError::Panicked(self.name.clone()))?;
        }
        Ok(())
    }
}

impl<T> Drop for BackgroundTask<T> {
    fn drop(&mut self) {
        if let Err(e) = self.join_thread() {
            error!(thread = %self.name, error = %e, "background task failed");
        }
    }
}

impl<T> fmt::Debug for BackgroundTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("name", &self.name)
            .field("joined", &self.thread.is_none())
            .finish()
    }
}
