//! Concurrent stress tests for the resource pool.
//!
//! Many threads and tasks hammer one pool with acquire/release cycles; the
//! pool must never hand one resource to two holders, never count more
//! allocations than factory calls, and never deadlock.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use resourcepool::{PoolConfiguration, PoolError, ResourcePool, TimeBudget};
use tokio::task::JoinSet;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn counting_pool(config: PoolConfiguration) -> (Arc<ResourcePool<usize>>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let pool = ResourcePool::from_fn(
        move || {
            // Simulate an expensive construction
            thread::sleep(Duration::from_micros(200));
            counter.fetch_add(1, Ordering::SeqCst)
        },
        config,
    );
    (Arc::new(pool), calls)
}

/// Records which resource values are currently held; panics on a double loan.
#[derive(Default)]
struct HeldSet(Mutex<HashSet<usize>>);

impl HeldSet {
    fn take(&self, value: usize) {
        assert!(self.0.lock().unwrap().insert(value), "resource {value} handed out twice");
    }

    fn put(&self, value: usize) {
        assert!(self.0.lock().unwrap().remove(&value));
    }
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

#[test]
fn threads_never_share_a_resource() {
    const THREADS: usize = 16;
    const CYCLES: usize = 200;

    let (pool, calls) = counting_pool(PoolConfiguration::default());
    let held = HeldSet::default();

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..CYCLES {
                    let resource = pool.acquire().unwrap();
                    held.take(*resource);
                    thread::yield_now();
                    held.put(*resource);
                    pool.release(resource).unwrap();

                    let allocated = pool.allocated();
                    assert!(allocated <= calls.load(Ordering::SeqCst));
                    assert!(allocated <= THREADS);
                }
            });
        }
    });

    assert_eq!(pool.allocated(), calls.load(Ordering::SeqCst));
    assert_eq!(pool.available(), pool.allocated());
    assert_eq!(pool.outstanding(), 0);
}

#[test]
fn bounded_pool_caps_allocations_under_contention() {
    const THREADS: usize = 12;
    const MAX_SIZE: usize = 3;

    let config = PoolConfiguration::new().with_max_size(MAX_SIZE);
    let (pool, calls) = counting_pool(config);
    let held = HeldSet::default();
    let timeouts = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..50 {
                    let budget = TimeBudget::start_new(Duration::from_secs(10));
                    match pool.acquire_within(&budget) {
                        Ok(resource) => {
                            held.take(*resource);
                            thread::sleep(Duration::from_micros(50));
                            held.put(*resource);
                            drop(resource);
                        }
                        Err(PoolError::Timeout(_)) => {
                            timeouts.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            });
        }
    });

    assert_eq!(timeouts.load(Ordering::SeqCst), 0);
    assert_eq!(pool.allocated(), MAX_SIZE);
    assert_eq!(calls.load(Ordering::SeqCst), MAX_SIZE);
    assert_eq!(pool.available(), MAX_SIZE);
}

#[test]
fn release_from_another_thread() {
    let (pool, _) = counting_pool(PoolConfiguration::default());
    let resource = pool.acquire().unwrap();

    let releaser = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.release(resource))
    };

    releaser.join().unwrap().unwrap();
    assert_eq!(pool.available(), 1);
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tasks_acquire_release_without_deadlock() {
    let config = PoolConfiguration::new()
        .with_max_size(4)
        .with_acquire_timeout(Duration::from_secs(10));
    let (pool, calls) = counting_pool(config);
    let held = Arc::new(HeldSet::default());
    let mut set = JoinSet::new();

    for _ in 0..32 {
        let pool = Arc::clone(&pool);
        let held = Arc::clone(&held);
        set.spawn(async move {
            for _ in 0..20 {
                let resource = pool.acquire_async().await.expect("task should acquire");
                held.take(*resource);
                tokio::time::sleep(Duration::from_millis(1)).await;
                held.put(*resource);
                drop(resource);
            }
        });
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    while let Some(result) = tokio::time::timeout_at(deadline, set.join_next())
        .await
        .expect("stress test should not deadlock (30s timeout)")
    {
        result.expect("task should not panic");
    }

    assert!(pool.allocated() <= 4);
    assert_eq!(pool.allocated(), calls.load(Ordering::SeqCst));
    assert_eq!(pool.available(), pool.allocated());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dispose_fails_pending_async_waiters() {
    let (pool, _) = counting_pool(PoolConfiguration::new().with_max_size(1));
    let held = pool.acquire_async().await.unwrap();

    let waiter = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.acquire_async().await.map(|r| r.id()) })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    pool.dispose();

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(PoolError::PoolDisposed)));
    drop(held);
}
