//! Worker pool configuration.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Default stack size for worker threads (2 MiB).
pub const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Configuration for a [`WorkerPool`](crate::core::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker threads started per parallel map.
    pub worker_count: usize,
    /// Stack size of each worker thread, in bytes.
    pub thread_stack_size: usize,
    /// Prefix for worker thread names (`{prefix}-{id}`, `{prefix}-join`).
    pub thread_name_prefix: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            thread_stack_size: DEFAULT_STACK_SIZE,
            thread_name_prefix: "pm-worker".into(),
        }
    }
}

impl WorkerPoolConfig {
    /// Default configuration: one worker per logical CPU.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Sets the worker thread stack size in bytes.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, thread_stack_size: usize) -> Self {
        self.thread_stack_size = thread_stack_size;
        self
    }

    /// Sets the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate pool configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid(
                "worker_count must be greater than 0".into(),
            ));
        }
        if self.thread_stack_size == 0 {
            return Err(ConfigError::Invalid(
                "thread_stack_size must be greater than 0".into(),
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "thread_name_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = WorkerPoolConfig::new();
        assert!(config.worker_count >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = WorkerPoolConfig::new()
            .with_worker_count(3)
            .with_thread_stack_size(64 * 1024)
            .with_thread_name_prefix("primes");
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.thread_stack_size, 64 * 1024);
        assert_eq!(config.thread_name_prefix, "primes");
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = WorkerPoolConfig::new().with_worker_count(0).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: worker_count must be greater than 0"
        );
    }
}
