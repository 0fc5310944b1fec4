//! Tests for configuration validation

use prometheus_task_core::config::{
    AlarmsConfig, ConfigError, ProcessConfig, RuntimeConfig, WorkerPoolConfig,
};
use std::path::PathBuf;

#[test]
fn test_worker_pool_config_validation() {
    let valid = WorkerPoolConfig::new()
        .with_worker_count(4)
        .with_thread_stack_size(1024 * 1024);
    assert!(valid.validate().is_ok());

    assert!(WorkerPoolConfig::new().with_worker_count(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_thread_stack_size(0).validate().is_err());
}

#[test]
fn test_worker_pool_default_uses_all_cpus() {
    assert_eq!(WorkerPoolConfig::default().worker_count, num_cpus::get());
}

#[test]
fn test_runtime_config_from_json() {
    let json = r#"{
        "workers": { "worker_count": 2, "thread_name_prefix": "json" },
        "alarms": { "thread_name": "json-alarms" },
        "process": { "default_cwd": "/tmp" }
    }"#;

    let config = RuntimeConfig::from_json_str(json).unwrap();
    assert_eq!(config.workers.worker_count, 2);
    assert_eq!(config.workers.thread_name_prefix, "json");
    assert_eq!(
        config.workers.thread_stack_size,
        WorkerPoolConfig::default().thread_stack_size
    );
    assert_eq!(config.alarms.thread_name, "json-alarms");
    assert_eq!(config.process.default_cwd, Some(PathBuf::from("/tmp")));
}

#[test]
fn test_runtime_config_empty_json_is_default() {
    let config = RuntimeConfig::from_json_str("{}").unwrap();
    assert_eq!(config, RuntimeConfig::default());
}

#[test]
fn test_runtime_config_rejects_bad_json() {
    assert!(matches!(
        RuntimeConfig::from_json_str("{ not json"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        RuntimeConfig::from_json_str(r#"{ "workers": { "worker_count": 0 } }"#),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_runtime_config_rejects_empty_alarm_thread_name() {
    let config = RuntimeConfig {
        alarms: AlarmsConfig {
            thread_name: String::new(),
        },
        ..RuntimeConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_runtime_config_serializes() {
    let config = RuntimeConfig {
        process: ProcessConfig {
            default_cwd: Some(PathBuf::from("/srv")),
        },
        ..RuntimeConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(RuntimeConfig::from_json_str(&json).unwrap(), config);
}
