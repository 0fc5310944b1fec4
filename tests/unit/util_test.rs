//! Tests for utility helpers

use prometheus_task_core::util::{deadline_after, init_tracing, remaining};
use std::thread;
use std::time::Duration;

#[test]
fn test_remaining_reaches_none() {
    let deadline = deadline_after(Duration::from_millis(10));
    assert!(remaining(deadline).is_some());
    thread::sleep(Duration::from_millis(20));
    assert_eq!(remaining(deadline), None);
}

#[test]
fn test_init_tracing_twice() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialized");
}
