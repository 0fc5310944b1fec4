//! Timer alarms served by a single scheduler thread.
//!
//! Requests travel to the scheduler through a [`ClosableQueue`]; the scheduler
//! keeps pending alarms in a min-heap keyed on their absolute deadline and
//! sleeps on the queue until either the earliest deadline passes or a new
//! request arrives.
//!
//! Two behaviours callers should know about:
//!
//! - The relative timeout becomes an absolute deadline when the scheduler
//!   dequeues the request, not when [`Alarms::add_alarm`] is called. Under a
//!   submission backlog the effective delay is longer than requested.
//! - Callbacks run one at a time on the scheduler thread. A slow callback
//!   delays every later deadline.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::config::AlarmsConfig;
use crate::util::clock;

use super::error::{AlarmError, TaskError};
use super::oneshot::BackgroundTask;
use super::queue::{ClosableQueue, PopResult};

type Callback = Box<dyn FnOnce() + Send + 'static>;

struct AlarmRequest {
    timeout: Duration,
    callback: Callback,
}

/// Heap entry ordered so the earliest deadline sits on top of the max-heap.
struct PendingAlarm {
    deadline: Instant,
    seq: u64,
    callback: Callback,
}

impl PartialEq for PendingAlarm {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for PendingAlarm {}

impl PartialOrd for PendingAlarm {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingAlarm {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: earlier deadline wins, then earlier insertion.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Closes the request queue when the scheduler exits, including by panic,
/// so later submissions are refused instead of silently never firing.
struct CloseOnExit<'a>(&'a ClosableQueue<AlarmRequest>);

impl Drop for CloseOnExit<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Schedules callbacks to run after a delay.
///
/// # Example
///
/// ```
/// use prometheus_task_core::core::Alarms;
/// use std::sync::mpsc;
/// use std::time::Duration;
///
/// let alarms = Alarms::new()?;
/// let (tx, rx) = mpsc::channel();
/// alarms.add_alarm(Duration::from_millis(5), move || tx.send("ring").unwrap());
/// assert_eq!(rx.recv().unwrap(), "ring");
/// alarms.shutdown()?;
/// # Ok::<(), prometheus_task_core::core::AlarmError>(())
/// ```
pub struct Alarms {
    requests: Arc<ClosableQueue<AlarmRequest>>,
    runner: Option<BackgroundTask<()>>,
}

impl Alarms {
    /// Starts a scheduler with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::Start` if the scheduler thread cannot be spawned.
    pub fn new() -> Result<Self, AlarmError> {
        Self::with_config(&AlarmsConfig::default())
    }

    /// Starts a scheduler whose thread is named after `config.thread_name`.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::Start` if the scheduler thread cannot be spawned.
    pub fn with_config(config: &AlarmsConfig) -> Result<Self, AlarmError> {
        let requests = Arc::new(ClosableQueue::new());
        let runner = {
            let requests = Arc::clone(&requests);
            BackgroundTask::spawn(config.thread_name.clone(), move || run_scheduler(&requests))
                .map_err(AlarmError::Start)?
        };
        info!(thread = %config.thread_name, "alarm scheduler started");
        Ok(Self {
            requests,
            runner: Some(runner),
        })
    }

    /// Schedules `callback` to run `timeout` from now.
    ///
    /// Returns `false` if the scheduler is no longer running.
    pub fn add_alarm<F>(&self, timeout: Duration, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.requests.push(AlarmRequest {
            timeout,
            callback: Box::new(callback),
        })
    }

    /// Returns `true` while the scheduler accepts new alarms.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }

    /// Stops the scheduler and joins its thread.
    ///
    /// Alarms that have not fired yet are discarded.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::SchedulerPanicked` if a callback panicked.
    pub fn shutdown(mut self) -> Result<(), AlarmError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), AlarmError> {
        self.requests.close();
        let Some(runner) = self.runner.take() else {
            return Ok(());
        };
        match runner.join() {
            Ok(()) => {
                debug!("alarm scheduler joined");
                Ok(())
            }
            Err(TaskError::Panicked(_)) => Err(AlarmError::SchedulerPanicked),
            Err(e) => Err(AlarmError::Start(e)),
        }
    }
}

impl Drop for Alarms {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(error = %e, "alarm scheduler stopped abnormally");
        }
    }
}

impl fmt::Debug for Alarms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alarms")
            .field("queued_requests", &self.requests.len())
            .field("running", &self.is_running())
            .finish()
    }
}

fn run_scheduler(requests: &ClosableQueue<AlarmRequest>) {
    let _close_on_exit = CloseOnExit(requests);
    let mut pending = BinaryHeap::new();
    let mut seq = 0_u64;

    loop {
        let next_deadline = pending.peek().map(|alarm: &PendingAlarm| alarm.deadline);
        let request = match next_deadline {
            None => match requests.pop() {
                Some(request) => Some(request),
                None => break,
            },
            Some(deadline) => match clock::remaining(deadline) {
                Some(timeout) => match requests.pop_with_timeout(timeout) {
                    PopResult::Item(request) => Some(request),
                    PopResult::TimedOut => None,
                    PopResult::Closed => break,
                },
                None => {
                    if let Some(alarm) = pending.pop() {
                        (alarm.callback)();
                    }
                    None
                }
            },
        };

        if let Some(request) = request {
            pending.push(PendingAlarm {
                deadline: clock::deadline_after(request.timeout),
                seq,
                callback: request.callback,
            });
            seq += 1;
        }
    }

    debug!(discarded = pending.len(), "alarm scheduler exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::mpsc;

    #[test]
    fn test_heap_orders_by_deadline_then_insertion() {
        let now = Instant::now();
        let mut heap = BinaryHeap::new();
        for (offset, seq) in [(30, 0), (10, 1), (10, 2), (20, 3)] {
            heap.push(PendingAlarm {
                deadline: now + Duration::from_millis(offset),
                seq,
                callback: Box::new(|| {}),
            });
        }

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|a| a.seq)).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_alarm_fires() {
        let alarms = Alarms::new().unwrap();
        let (tx, rx) = mpsc::channel();

        assert!(alarms.add_alarm(Duration::from_millis(10), move || {
            tx.send(()).unwrap();
        }));

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        alarms.shutdown().unwrap();
    }

    #[test]
    fn test_zero_timeout_fires_immediately() {
        let alarms = Alarms::new().unwrap();
        let (tx, rx) = mpsc::channel();
        alarms.add_alarm(Duration::ZERO, move || tx.send(1).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
    }

    #[test]
    fn test_shutdown_discards_pending() {
        let fired = Arc::new(Mutex::new(false));
        let alarms = Alarms::new().unwrap();
        {
            let fired = Arc::clone(&fired);
            alarms.add_alarm(Duration::from_secs(60), move || *fired.lock() = true);
        }

        alarms.shutdown().unwrap();
        assert!(!*fired.lock());
    }

    #[test]
    fn test_panicking_callback_stops_scheduler() {
        let alarms = Alarms::new().unwrap();
        alarms.add_alarm(Duration::ZERO, || panic!("callback failure"));

        let start = Instant::now();
        while alarms.is_running() && start.elapsed() < Duration::from_secs(5) {
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(!alarms.add_alarm(Duration::ZERO, || {}));
        assert!(matches!(alarms.shutdown(), Err(AlarmError::SchedulerPanicked)));
    }
}
