//! Build the runtime components from configuration.

use anyhow::Context;
use tracing::info;

use crate::config::RuntimeConfig;
use crate::core::{Alarms, AppResult, WorkerPool};
#[cfg(unix)]
use crate::process::ProcessManager;

/// Components built from one [`RuntimeConfig`].
#[derive(Debug)]
pub struct TaskRuntime {
    /// Parallel map launcher.
    pub pool: WorkerPool,
    /// Alarm scheduler, already running.
    pub alarms: Alarms,
    /// Process manager with the configured default working directory.
    #[cfg(unix)]
    pub processes: ProcessManager,
}

/// Validate `cfg` and construct every component.
///
/// # Errors
///
/// Fails if the configuration is invalid or the alarm thread cannot start.
pub fn build_runtime(cfg: &RuntimeConfig) -> AppResult<TaskRuntime> {
    cfg.validate().context("runtime configuration invalid")?;

    let pool = WorkerPool::new(cfg.workers.clone()).context("building worker pool")?;
    let alarms = Alarms::with_config(&cfg.alarms).context("starting alarm scheduler")?;

    info!(
        workers = cfg.workers.worker_count,
        alarm_thread = %cfg.alarms.thread_name,
        "task runtime built"
    );

    Ok(TaskRuntime {
        pool,
        alarms,
        #[cfg(unix)]
        processes: ProcessManager::with_config(cfg.process.clone()),
    })
}
