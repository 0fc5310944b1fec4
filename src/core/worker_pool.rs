//! Parallel map over a finite input sequence using dedicated OS threads.
//!
//! `go` wraps the inputs in a [`PopQueue`], starts `num_workers` threads that
//! claim inputs, apply the map function and push each result into an unbounded
//! [`ClosableQueue`], plus one join thread that waits for every worker and then
//! closes the output queue. The returned [`ParallelMap`] iterates the output
//! queue until it is closed.
//!
//! # Ordering
//!
//! Results arrive in **completion order**, not input order. Pair each result
//! with its input (or an index) when the caller needs to correlate them.
//!
//! # Failure semantics
//!
//! Worker threads have no supervisor to report to, so the map function is
//! expected to fold its failures into `R` (for example `R = Result<_, _>`). A
//! panicking map function is fatal: the remaining workers finish, the output
//! queue is closed, and the panic is re-raised on the thread that joins the
//! [`ParallelMap`].
//!
//! # Example
//!
//! ```
//! use prometheus_task_core::core::worker_pool;
//!
//! let mut squares: Vec<u64> = worker_pool::go(1..=4_u64, 2, |x| x * x)?.collect();
//! squares.sort_unstable();
//! assert_eq!(squares, vec![1, 4, 9, 16]);
//! # Ok::<(), prometheus_task_core::core::PoolError>(())
//! ```

use std::any::Any;
use std::fmt;
use std::io;
use std::iter::FusedIterator;
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::config::WorkerPoolConfig;

use super::error::PoolError;
use super::oneshot::{self, BackgroundTask};
use super::pop_queue::PopQueue;
use super::queue::ClosableQueue;

type PanicPayload = Box<dyn Any + Send + 'static>;

/// Statistics about a running or finished parallel map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Number of inputs the map was started with.
    pub inputs: usize,
    /// Inputs claimed by a worker so far.
    pub claimed: usize,
    /// Map function calls that returned.
    pub completed: usize,
    /// Results already taken by the consumer.
    pub consumed: usize,
    /// Whether every worker has exited and the output queue is closed.
    pub finished: bool,
}

/// Internal counters shared with the workers (lock-free atomics).
#[derive(Debug, Default)]
struct MapCounters {
    claimed: AtomicUsize,
    completed: AtomicUsize,
}

/// Starts a parallel map with `num_workers` threads and default settings.
///
/// # Errors
///
/// - `PoolError::InvalidConfig` if `num_workers` is zero
/// - `PoolError::Spawn` / `PoolError::Task` if a thread cannot be created
pub fn go<I, F, R>(inputs: I, num_workers: usize, map: F) -> Result<ParallelMap<R>, PoolError>
where
    I: IntoIterator,
    I::Item: Send + 'static,
    F: Fn(I::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    WorkerPool::new(WorkerPoolConfig::new().with_worker_count(num_workers))?.map(inputs, map)
}

/// Configured launcher for parallel maps.
///
/// The pool itself owns no threads: each [`map`](Self::map) call starts its own
/// workers and join thread, which live exactly as long as that map's handle.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    config: WorkerPoolConfig,
}

impl WorkerPool {
    /// Create a pool from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        config
            .validate()
            .map_err(|e| PoolError::InvalidConfig(e.to_string()))?;
        Ok(Self { config })
    }

    /// Pool configuration.
    #[must_use]
    pub const fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Applies `map` to every input on the pool's worker threads.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Task` if the join thread cannot be created and
    /// `PoolError::Spawn` if a worker cannot be created. In the latter case the
    /// workers already started are joined before returning.
    pub fn map<I, F, R>(&self, inputs: I, map: F) -> Result<ParallelMap<R>, PoolError>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        let inputs: Arc<PopQueue<I::Item>> = Arc::new(inputs.into_iter().collect());
        let input_len = inputs.len();
        let output = Arc::new(ClosableQueue::new());
        let counters = Arc::new(MapCounters::default());
        let map = Arc::new(map);
        let prefix = &self.config.thread_name_prefix;

        // The join thread starts first so that every worker, even after a
        // partial spawn failure, has someone to join it.
        let (workers_tx, workers_rx) = oneshot::channel::<Vec<JoinHandle<()>>>();
        let waiter = {
            let output = Arc::clone(&output);
            BackgroundTask::spawn(format!("{prefix}-join"), move || {
                join_workers(workers_rx.recv().unwrap_or_default(), &output)
            })?
        };

        let mut workers = Vec::with_capacity(self.config.worker_count);
        let mut spawn_error = None;
        for worker_id in 0..self.config.worker_count {
            match spawn_worker(
                worker_id,
                &self.config,
                Arc::clone(&inputs),
                Arc::clone(&output),
                Arc::clone(&map),
                Arc::clone(&counters),
            ) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    error!(worker_id = worker_id, error = %e, "Failed to spawn worker thread");
                    spawn_error = Some(e);
                    break;
                }
            }
        }
        workers_tx.send(workers);

        let handle = ParallelMap {
            output,
            counters,
            worker_count: self.config.worker_count,
            input_len,
            consumed: 0,
            waiter: Some(waiter),
        };

        if let Some(e) = spawn_error {
            handle.join();
            return Err(PoolError::Spawn(e));
        }

        info!(
            worker_count = self.config.worker_count,
            inputs = input_len,
            "Parallel map started"
        );
        Ok(handle)
    }
}

/// Lazy, single-pass handle over the results of a parallel map.
///
/// Iterating yields results in completion order and joins the background
/// threads once the output is exhausted. [`join`](Self::join) consumes the
/// handle, so a map can never be joined twice; dropping an unjoined handle
/// joins it as well.
#[must_use = "a ParallelMap joins its worker threads when dropped"]
pub struct ParallelMap<R> {
    output: Arc<ClosableQueue<R>>,
    counters: Arc<MapCounters>,
    worker_count: usize,
    input_len: usize,
    consumed: usize,
    waiter: Option<BackgroundTask<Option<PanicPayload>>>,
}

impl<R> ParallelMap<R> {
    /// Waits for every worker to finish, discarding results not yet consumed.
    ///
    /// # Panics
    ///
    /// Re-raises the panic of a worker whose map function panicked.
    pub fn join(mut self) {
        self.finish();
    }

    /// Snapshot of the map's progress.
    #[must_use]
    pub fn stats(&self) -> MapStats {
        MapStats {
            worker_count: self.worker_count,
            inputs: self.input_len,
            claimed: self.counters.claimed.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            consumed: self.consumed,
            finished: self.output.is_closed(),
        }
    }

    fn finish(&mut self) {
        let Some(waiter) = self.waiter.take() else {
            return;
        };
        match waiter.join() {
            Ok(None) => debug!(inputs = self.input_len, "Parallel map joined"),
            Ok(Some(payload)) => {
                if thread::panicking() {
                    error!("Parallel map worker panicked while the owner was unwinding");
                } else {
                    panic::resume_unwind(payload);
                }
            }
            Err(e) => error!(error = %e, "Parallel map join thread failed"),
        }
    }
}

impl<R> Iterator for ParallelMap<R> {
    type Item = R;

    fn next(&mut self) -> Option<R> {
        if let Some(result) = self.output.pop() {
            self.consumed += 1;
            Some(result)
        } else {
            self.finish();
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (
            self.output.len(),
            Some(self.input_len.saturating_sub(self.consumed)),
        )
    }
}

impl<R> FusedIterator for ParallelMap<R> {}

impl<R> Drop for ParallelMap<R> {
    fn drop(&mut self) {
        if self.waiter.is_some() {
            debug!(
                consumed = self.consumed,
                inputs = self.input_len,
                "ParallelMap dropped before it was drained - joining workers"
            );
            self.finish();
        }
    }
}

impl<R> fmt::Debug for ParallelMap<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelMap")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Joins every worker, then closes the output queue.
///
/// Returns the first worker panic, if any, so the owner can re-raise it.
fn join_workers<R>(
    workers: Vec<JoinHandle<()>>,
    output: &ClosableQueue<R>,
) -> Option<PanicPayload> {
    let mut first_panic = None;
    for (worker_id, worker) in workers.into_iter().enumerate() {
        if let Err(payload) = worker.join() {
            error!(worker_id = worker_id, "Worker panicked");
            if first_panic.is_none() {
                first_panic = Some(payload);
            }
        }
    }
    output.close();
    first_panic
}

/// Spawn a worker thread.
fn spawn_worker<T, R, F>(
    worker_id: usize,
    config: &WorkerPoolConfig,
    inputs: Arc<PopQueue<T>>,
    output: Arc<ClosableQueue<R>>,
    map: Arc<F>,
    counters: Arc<MapCounters>,
) -> io::Result<JoinHandle<()>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
{
    thread::Builder::new()
        .name(format!("{}-{worker_id}", config.thread_name_prefix))
        .stack_size(config.thread_stack_size)
        .spawn(move || {
            debug!(worker_id = worker_id, "Worker thread started");

            for input in inputs.iter() {
                counters.claimed.fetch_add(1, Ordering::Relaxed);
                let result = (*map)(input);
                counters.completed.fetch_add(1, Ordering::Relaxed);

                if !output.push(result) {
                    debug!(worker_id = worker_id, "Output queue closed, exiting");
                    break;
                }
            }

            debug!(worker_id = worker_id, "Worker thread exiting");
        })
}
