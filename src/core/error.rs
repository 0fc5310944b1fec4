//! Error types for queue consumers, alarms and worker pools.

use thiserror::Error;

/// Errors produced by a [`BackgroundTask`](crate::core::oneshot::BackgroundTask).
#[derive(Debug, Error)]
pub enum TaskError {
    /// The OS refused to create the background thread.
    #[error("failed to spawn background thread `{name}`: {source}")]
    Spawn {
        /// Thread name that was requested.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// The background closure panicked before publishing its value.
    #[error("background thread `{0}` panicked")]
    Panicked(String),
    /// The value was already taken from the one-shot.
    #[error("background result already taken")]
    AlreadyTaken,
}

/// Errors produced by the [`Alarms`](crate::core::alarms::Alarms) scheduler.
#[derive(Debug, Error)]
pub enum AlarmError {
    /// The scheduler thread could not be started.
    #[error("failed to start alarm scheduler: {0}")]
    Start(#[source] TaskError),
    /// A callback panicked and took the scheduler thread down with it.
    #[error("alarm scheduler thread panicked")]
    SchedulerPanicked,
}

/// Errors produced when starting a [`ParallelMap`](crate::core::worker_pool::ParallelMap).
#[derive(Debug, Error)]
pub enum PoolError {
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be created.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The join thread could not be created.
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
