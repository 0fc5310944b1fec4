//! Tests for building runtime components from configuration

use prometheus_task_core::builders::build_runtime;
use prometheus_task_core::config::{RuntimeConfig, WorkerPoolConfig};
use std::sync::mpsc;
use std::time::Duration;

#[test]
fn test_build_runtime_components_work() {
    let config = RuntimeConfig {
        workers: WorkerPoolConfig::new().with_worker_count(2),
        ..RuntimeConfig::default()
    };
    let runtime = build_runtime(&config).unwrap();
    assert_eq!(runtime.pool.config().worker_count, 2);

    let doubled: Vec<u32> = runtime.pool.map(vec![21], |x: u32| x * 2).unwrap().collect();
    assert_eq!(doubled, vec![42]);

    let (tx, rx) = mpsc::channel();
    runtime
        .alarms
        .add_alarm(Duration::from_millis(1), move || tx.send(()).unwrap());
    rx.recv_timeout(Duration::from_secs(5)).unwrap();

    #[cfg(unix)]
    assert_eq!(runtime.processes.num_running_processes(), 0);
}

#[test]
fn test_build_runtime_rejects_invalid_config() {
    let config = RuntimeConfig {
        workers: WorkerPoolConfig::new().with_worker_count(0),
        ..RuntimeConfig::default()
    };
    let err = build_runtime(&config).unwrap_err();
    assert!(format!("{err:#}").contains("worker_count must be greater than 0"));
}
