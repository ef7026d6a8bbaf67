//! Bounded pools: blocking, failing fast and async acquisition

use resourcepool::{ExhaustionPolicy, PoolConfiguration, ResourcePool, TimeBudget};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    println!("=== resourcepool - Bounded Pools ===\n");

    // Example 1: Timeout under exhaustion
    blocking_with_budget();

    // Example 2: Fail fast
    fail_fast();

    // Example 3: Async waiters
    async_waiters().await;

    // Example 4: Prometheus export
    prometheus_export();
}

fn blocking_with_budget() {
    println!("1. Blocking with Budget:");
    let pool = ResourcePool::from_fn(|| 0u64, PoolConfiguration::new().with_max_size(1));

    let _held = pool.acquire().unwrap();
    let budget = TimeBudget::start_new(Duration::from_millis(50));
    match pool.acquire_within(&budget) {
        Ok(_) => println!("   Got resource"),
        Err(e) => println!("   Error: {}", e),
    }
    println!();
}

fn fail_fast() {
    println!("2. Fail Fast:");
    let config = PoolConfiguration::new()
        .with_max_size(1)
        .with_exhaustion_policy(ExhaustionPolicy::FailFast);
    let pool = ResourcePool::from_fn(|| 0u64, config);

    let _held = pool.acquire().unwrap();
    if let Err(e) = pool.acquire() {
        println!("   Error: {}\n", e);
    }
}

async fn async_waiters() {
    println!("3. Async Waiters:");
    let config = PoolConfiguration::new()
        .with_max_size(2)
        .with_acquire_timeout(Duration::from_secs(5));
    let pool = Arc::new(ResourcePool::from_fn(|| vec![0u8; 512], config));

    let mut handles = vec![];
    for worker in 0..6 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            let buf = pool.acquire_async().await.unwrap();
            sleep(Duration::from_millis(10)).await;
            println!("   Worker {} used buffer {}", worker, buf.id());
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    println!("   Allocated: {} (cap 2)\n", pool.allocated());
}

fn prometheus_export() {
    println!("4. Prometheus Export:");
    let pool = ResourcePool::from_fn(String::new, PoolConfiguration::new().with_max_size(4));
    let _a = pool.acquire().unwrap();

    print!("{}", pool.export_metrics_prometheus("demo", None));
}
