//! Core concurrency primitives: closable queues, one-shots, alarms and
//! parallel map.

pub mod alarms;
pub mod error;
pub mod oneshot;
pub mod pop_queue;
pub mod queue;
pub mod worker_pool;

pub use alarms::Alarms;
pub use error::{AlarmError, AppResult, PoolError, TaskError};
pub use oneshot::BackgroundTask;
pub use pop_queue::PopQueue;
pub use queue::{ClosableQueue, PopResult};
pub use worker_pool::{go, MapStats, ParallelMap, WorkerPool};
