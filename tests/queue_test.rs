//! Integration tests for ClosableQueue and PopQueue under concurrency
//!
//! These tests validate:
//! - No item is lost or duplicated across many producers and consumers
//! - Close wakes every blocked consumer and producer
//! - Bounded queues apply back-pressure
//! - PopQueue hands out each element exactly once

use prometheus_task_core::core::{ClosableQueue, PopQueue, PopResult};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_multi_producer_multi_consumer_multiset() {
    const PRODUCERS: u64 = 4;
    const CONSUMERS: usize = 3;
    const PER_PRODUCER: u64 = 500;

    let queue = Arc::new(ClosableQueue::bounded(16));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut rng = rand::rng();
                for i in 0..PER_PRODUCER {
                    if rng.random_ratio(1, 50) {
                        thread::sleep(Duration::from_micros(rng.random_range(10..200)));
                    }
                    assert!(queue.push(p * PER_PRODUCER + i));
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.iter().collect::<Vec<u64>>())
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    queue.close();

    let mut seen: HashMap<u64, usize> = HashMap::new();
    for consumer in consumers {
        for item in consumer.join().unwrap() {
            *seen.entry(item).or_default() += 1;
        }
    }

    assert_eq!(seen.len() as u64, PRODUCERS * PER_PRODUCER);
    assert!(seen.values().all(|&count| count == 1));
    assert!(queue.is_closed_and_empty());
}

#[test]
fn test_fifo_per_producer() {
    let queue = Arc::new(ClosableQueue::new());
    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            for i in 0..1_000 {
                queue.push(i);
            }
            queue.close();
        })
    };

    let received: Vec<i32> = queue.iter().collect();
    producer.join().unwrap();
    assert_eq!(received, (0..1_000).collect::<Vec<_>>());
}

#[test]
fn test_close_wakes_blocked_consumers() {
    let queue: Arc<ClosableQueue<u8>> = Arc::new(ClosableQueue::new());
    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    queue.close();

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), None);
    }
}

#[test]
fn test_close_wakes_blocked_producer() {
    let queue = Arc::new(ClosableQueue::bounded(1));
    assert!(queue.push(1));

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.push(2))
    };

    thread::sleep(Duration::from_millis(50));
    queue.close();

    assert!(!producer.join().unwrap());
    // The item buffered before close is still delivered.
    assert_eq!(queue.pop(), Some(1));
    assert_eq!(queue.pop(), None);
}

#[test]
fn test_bounded_back_pressure() {
    let queue = Arc::new(ClosableQueue::bounded(2));
    queue.push(1);
    queue.push(2);

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let start = Instant::now();
            queue.push(3);
            start.elapsed()
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pop(), Some(1));

    let blocked_for = producer.join().unwrap();
    assert!(blocked_for >= Duration::from_millis(50));
    assert_eq!(queue.iter().take(2).collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn test_pop_with_timeout_outcomes() {
    let queue = Arc::new(ClosableQueue::new());

    let start = Instant::now();
    assert_eq!(
        queue.pop_with_timeout(Duration::from_millis(30)),
        PopResult::TimedOut
    );
    assert!(start.elapsed() >= Duration::from_millis(30));

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            queue.push("late");
        })
    };
    assert_eq!(
        queue.pop_with_timeout(Duration::from_secs(5)),
        PopResult::Item("late")
    );
    producer.join().unwrap();

    queue.close();
    assert_eq!(
        queue.pop_with_timeout(Duration::from_secs(5)),
        PopResult::Closed
    );
}

#[test]
fn test_wait_available() {
    let queue = Arc::new(ClosableQueue::new());
    let waiter = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.wait_available())
    };
    thread::sleep(Duration::from_millis(20));
    queue.push(9);
    assert!(waiter.join().unwrap());
    assert_eq!(queue.len(), 1);

    queue.pop();
    queue.close();
    assert!(!queue.wait_available());
}

#[test]
fn test_pop_queue_shared_by_threads() {
    let mut rng = rand::rng();
    let items: Vec<u32> = (0..5_000).map(|_| rng.random()).collect();
    let expected_sum: u64 = items.iter().map(|&x| u64::from(x)).sum();
    let queue = Arc::new(PopQueue::new(items));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut sum = 0_u64;
                let mut count = 0_usize;
                while let Some(x) = queue.pop() {
                    sum += u64::from(x);
                    count += 1;
                }
                (sum, count)
            })
        })
        .collect();

    let (sum, count) = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .fold((0, 0), |(s, c), (ds, dc)| (s + ds, c + dc));

    assert_eq!(count, 5_000);
    assert_eq!(sum, expected_sum);
    assert!(queue.is_empty());
    assert_eq!(queue.remaining(), 0);
}
