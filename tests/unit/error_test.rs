//! Tests for error types

use prometheus_task_core::config::ConfigError;
use prometheus_task_core::core::{AlarmError, PoolError, TaskError};
use std::error::Error;
use std::io;

#[test]
fn test_task_spawn_error() {
    let err = TaskError::Spawn {
        name: "pm-alarms".into(),
        source: io::Error::new(io::ErrorKind::OutOfMemory, "no threads left"),
    };
    assert_eq!(
        format!("{err}"),
        "failed to spawn background thread `pm-alarms`: no threads left"
    );
    assert!(err.source().is_some());
}

#[test]
fn test_alarm_error_wraps_task_error() {
    let err = AlarmError::Start(TaskError::Panicked("pm-alarms".into()));
    assert_eq!(
        format!("{err}"),
        "failed to start alarm scheduler: background thread `pm-alarms` panicked"
    );
    assert_eq!(
        format!("{}", AlarmError::SchedulerPanicked),
        "alarm scheduler thread panicked"
    );
}

#[test]
fn test_pool_error_from_task_error() {
    let err: PoolError = TaskError::AlreadyTaken.into();
    assert!(matches!(err, PoolError::Task(TaskError::AlreadyTaken)));
    assert_eq!(format!("{err}"), "background result already taken");
}

#[test]
fn test_config_env_error() {
    let err = ConfigError::Env {
        var: "TASK_CORE_WORKERS",
        value: "lots".into(),
    };
    assert_eq!(
        format!("{err}"),
        "environment variable TASK_CORE_WORKERS=\"lots\" is not valid"
    );
}

#[test]
fn test_errors_convert_to_anyhow() {
    fn fails() -> prometheus_task_core::core::AppResult<()> {
        Err(PoolError::InvalidConfig("worker_count must be greater than 0".into()))?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(err.downcast_ref::<PoolError>().is_some());
}
