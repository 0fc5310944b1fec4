//! Tests for the tokio bridge

#![cfg(feature = "tokio-runtime")]

use prometheus_task_core::core::{worker_pool, ClosableQueue, PopResult};
use prometheus_task_core::runtime::{BridgeError, TokioSpawner};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pop_async_receives_from_thread() {
    let spawner = TokioSpawner::try_current().unwrap();
    let queue = Arc::new(ClosableQueue::new());

    let producer = {
        let queue = Arc::clone(&queue);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            queue.push("from a thread");
            queue.close();
        })
    };

    assert_eq!(
        spawner.pop_async(Arc::clone(&queue)).await.unwrap(),
        Some("from a thread")
    );
    assert_eq!(spawner.pop_async(Arc::clone(&queue)).await.unwrap(), None);
    producer.join().unwrap();
}

#[tokio::test]
async fn test_pop_timeout_async() {
    let spawner = TokioSpawner::try_current().unwrap();
    let queue: Arc<ClosableQueue<u8>> = Arc::new(ClosableQueue::new());
    assert_eq!(
        spawner
            .pop_timeout_async(queue, Duration::from_millis(20))
            .await
            .unwrap(),
        PopResult::TimedOut
    );
}

#[tokio::test]
async fn test_run_blocking_parallel_map() {
    let spawner = TokioSpawner::try_current().unwrap();
    let total: u64 = spawner
        .run_blocking(|| worker_pool::go(1..=10_u64, 3, |x| x * x).map(|map| map.sum::<u64>()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(total, 385);
}

#[tokio::test]
async fn test_run_blocking_panic_is_join_error() {
    let spawner = TokioSpawner::try_current().unwrap();
    let err = spawner
        .run_blocking(|| -> u8 { panic!("blocking failure") })
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Join(_)));
}

#[test]
fn test_try_current_outside_runtime() {
    assert!(matches!(
        TokioSpawner::try_current(),
        Err(BridgeError::NoRuntime(_))
    ));
}

#[test]
fn test_owned_runtime() {
    let spawner = TokioSpawner::with_worker_threads(1).unwrap();
    let value = spawner
        .handle()
        .block_on(spawner.run_blocking(|| 6 * 7))
        .unwrap();
    assert_eq!(value, 42);
}

#[cfg(unix)]
mod process {
    use super::*;
    use prometheus_task_core::process::{
        CreateProcessArgs, OutputCapture, OutputSpec, ProcessError, ProcessManager,
    };

    #[tokio::test]
    async fn test_run_async_captures_output() {
        let spawner = TokioSpawner::try_current().unwrap();
        let capture = OutputCapture::new();
        spawner
            .run_async(
                &ProcessManager::new(),
                &CreateProcessArgs::new("echo")
                    .arg("async")
                    .stdout(OutputSpec::Capture(capture.clone())),
            )
            .await
            .unwrap();
        assert_eq!(capture.output().unwrap(), "async\n");
    }

    #[tokio::test]
    async fn test_wait_async_reports_exit_status() {
        let spawner = TokioSpawner::try_current().unwrap();
        let proc = ProcessManager::new()
            .spawn(&CreateProcessArgs::new("false"))
            .unwrap();
        let err = spawner.wait_async(proc).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Process(ProcessError::NonZeroExit(1))
        ));
    }
}
