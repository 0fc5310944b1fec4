//! Tokio bridge for the blocking primitives.
//!
//! Every wait in this crate parks an OS thread. From async code those waits
//! are moved onto tokio's blocking thread pool with `spawn_blocking`, so the
//! async workers keep running.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::{Handle, Runtime, TryCurrentError};
use tokio::task::JoinError;

use crate::core::{ClosableQueue, PopResult};
#[cfg(unix)]
use crate::process::{CreateProcessArgs, ProcessError, ProcessManager, SubProcess};

/// Errors produced by [`TokioSpawner`].
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No tokio runtime is running on this thread.
    #[error("no tokio runtime: {0}")]
    NoRuntime(#[from] TryCurrentError),
    /// The blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] JoinError),
    /// The runtime could not be built.
    #[error("failed to build tokio runtime: {0}")]
    Build(#[source] std::io::Error),
    /// The process operation failed.
    #[cfg(unix)]
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Handle to a tokio runtime used to await blocking operations.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
    // Keeps an owned runtime alive for as long as any clone exists.
    _runtime: Option<Arc<Runtime>>,
}

impl TokioSpawner {
    /// Wrap an existing runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self {
            handle,
            _runtime: None,
        }
    }

    /// Wrap the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// `BridgeError::NoRuntime` outside a tokio runtime.
    pub fn try_current() -> Result<Self, BridgeError> {
        Ok(Self::new(Handle::try_current()?))
    }

    /// Create a spawner owning a new multi-threaded runtime.
    ///
    /// The last clone must not be dropped from inside an async context.
    ///
    /// # Errors
    ///
    /// `BridgeError::Build` if the runtime cannot be created.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, BridgeError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("pm-tokio")
            .enable_all()
            .build()
            .map_err(BridgeError::Build)?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(runtime)),
        })
    }

    /// Runtime handle.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Run a blocking closure on the blocking pool and await its result.
    ///
    /// # Errors
    ///
    /// `BridgeError::Join` if the closure panicked.
    pub async fn run_blocking<F, R>(&self, f: F) -> Result<R, BridgeError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        Ok(self.handle.spawn_blocking(f).await?)
    }

    /// Await the next item of a closable queue; `None` once it is closed and
    /// drained.
    ///
    /// # Errors
    ///
    /// `BridgeError::Join` if the blocking task failed.
    pub async fn pop_async<T>(&self, queue: Arc<ClosableQueue<T>>) -> Result<Option<T>, BridgeError>
    where
        T: Send + 'static,
    {
        self.run_blocking(move || queue.pop()).await
    }

    /// Like [`pop_async`](Self::pop_async) but gives up after `timeout`.
    ///
    /// The wait itself is bounded, so no blocking thread is left parked after
    /// the timeout.
    ///
    /// # Errors
    ///
    /// `BridgeError::Join` if the blocking task failed.
    pub async fn pop_timeout_async<T>(
        &self,
        queue: Arc<ClosableQueue<T>>,
        timeout: Duration,
    ) -> Result<PopResult<T>, BridgeError>
    where
        T: Send + 'static,
    {
        self.run_blocking(move || queue.pop_with_timeout(timeout))
            .await
    }

    /// Await the exit of a child process.
    ///
    /// # Errors
    ///
    /// `BridgeError::Process` with the error [`SubProcess::wait`] reports.
    #[cfg(unix)]
    pub async fn wait_async(&self, proc: Arc<SubProcess>) -> Result<(), BridgeError> {
        Ok(self.run_blocking(move || proc.wait()).await??)
    }

    /// Spawn a child with `manager` and await its exit.
    ///
    /// # Errors
    ///
    /// `BridgeError::Process` if spawning or waiting fails.
    #[cfg(unix)]
    pub async fn run_async(
        &self,
        manager: &ProcessManager,
        args: &CreateProcessArgs,
    ) -> Result<(), BridgeError> {
        let proc = manager.spawn(args)?;
        self.wait_async(proc).await
    }
}
