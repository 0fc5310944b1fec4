//! Configuration models for worker pools, alarms and process management.

pub mod pool;
pub mod runtime;

use thiserror::Error;

pub use pool::WorkerPoolConfig;
pub use runtime::{AlarmsConfig, ProcessConfig, RuntimeConfig};

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// The JSON document could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// An environment variable held an unusable value.
    #[error("environment variable {var}={value:?} is not valid")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Raw value found in the environment.
        value: String,
    },
}
