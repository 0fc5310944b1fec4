//! # Prometheus Task Core
//!
//! Thread-level concurrency building blocks for the Prometheus AI Platform:
//! a closable blocking queue, one-shot results from background threads, a
//! timer scheduler, a parallel map over OS worker threads, and a sub-process
//! manager.
//!
//! ## Key Features
//!
//! - **ClosableQueue**: optionally bounded FIFO whose close is observed by
//!   every producer and consumer
//! - **Alarms**: callbacks fired after a delay by one scheduler thread
//! - **Parallel map**: `worker_pool::go` maps a finite input set on dedicated
//!   threads and streams the results in completion order
//! - **Sub-processes**: spawn children with redirected streams, capture their
//!   output, and reap one or whichever finishes first (Unix only)
//! - **Tokio bridge**: await any blocking wait from async code (feature
//!   `tokio-runtime`)
//!
//! ## Parallel map
//!
//! ```rust
//! use prometheus_task_core::core::worker_pool;
//!
//! let is_prime = |n: u64| n > 1 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0);
//! let mut primes: Vec<u64> = worker_pool::go(5..50_u64, 2, move |n| (n, is_prime(n)))?
//!     .filter_map(|(n, prime)| prime.then_some(n))
//!     .collect();
//! primes.sort_unstable();
//! assert_eq!(primes[..3], [5, 7, 11]);
//! # Ok::<(), prometheus_task_core::core::PoolError>(())
//! ```
//!
//! ## Building from configuration
//!
//! ```rust,ignore
//! use prometheus_task_core::builders::build_runtime;
//! use prometheus_task_core::config::RuntimeConfig;
//!
//! prometheus_task_core::util::init_tracing();
//! let runtime = build_runtime(&RuntimeConfig::from_env()?)?;
//! runtime.alarms.add_alarm(std::time::Duration::from_secs(1), || println!("tick"));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Queues, one-shots, alarms and the worker pool.
pub mod core;
/// Configuration models for pools, alarms and processes.
pub mod config;
/// Builders to construct runtime components from configuration.
pub mod builders;
/// Sub-process orchestration.
#[cfg(unix)]
pub mod process;
/// Async runtime adapters.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
