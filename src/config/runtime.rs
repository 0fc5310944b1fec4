//! Root runtime configuration: pool, alarms and process settings.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

use super::{ConfigError, WorkerPoolConfig};

/// Environment variable overriding [`WorkerPoolConfig::worker_count`].
pub const ENV_WORKERS: &str = "TASK_CORE_WORKERS";
/// Environment variable overriding [`WorkerPoolConfig::thread_stack_size`].
pub const ENV_STACK_SIZE: &str = "TASK_CORE_STACK_SIZE";
/// Environment variable overriding [`AlarmsConfig::thread_name`].
pub const ENV_ALARM_THREAD: &str = "TASK_CORE_ALARM_THREAD";
/// Environment variable setting [`ProcessConfig::default_cwd`].
pub const ENV_PROCESS_CWD: &str = "TASK_CORE_PROCESS_CWD";

/// Alarm scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmsConfig {
    /// Name of the scheduler thread.
    pub thread_name: String,
}

impl Default for AlarmsConfig {
    fn default() -> Self {
        Self {
            thread_name: "pm-alarms".into(),
        }
    }
}

/// Process manager configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Working directory for children that do not request one.
    pub default_cwd: Option<PathBuf>,
}

/// Root configuration for a task runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker pool settings.
    pub workers: WorkerPoolConfig,
    /// Alarm scheduler settings.
    pub alarms: AlarmsConfig,
    /// Process manager settings.
    pub process: ProcessConfig,
}

impl RuntimeConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the offending section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.workers
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("workers: {e}")))?;
        if self.alarms.thread_name.is_empty() {
            return Err(ConfigError::Invalid(
                "alarms: thread_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Parse runtime configuration from a JSON string and validate.
    ///
    /// Missing sections and fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and
    /// `ConfigError::Invalid` for values that fail validation.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(input)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overridden by `lookup(name)` values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Env` for unparsable values and
    /// `ConfigError::Invalid` if the result fails validation.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(workers) = parse_var(&lookup, ENV_WORKERS)? {
            cfg.workers.worker_count = workers;
        }
        if let Some(stack) = parse_var(&lookup, ENV_STACK_SIZE)? {
            cfg.workers.thread_stack_size = stack;
        }
        if let Some(name) = lookup(ENV_ALARM_THREAD) {
            cfg.alarms.thread_name = name;
        }
        if let Some(cwd) = lookup(ENV_PROCESS_CWD) {
            cfg.process.default_cwd = Some(PathBuf::from(cwd));
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a `.env` file if present, then read configuration from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Fails if any `TASK_CORE_*` variable is malformed or invalid.
    pub fn from_env() -> AppResult<Self> {
        // A missing .env file is fine; the process environment still applies.
        let _ = dotenvy::dotenv();
        Self::from_vars(|name| std::env::var(name).ok())
            .context("loading runtime configuration from environment")
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { var, value })
        })
        .transpose()
}
