//! Basic usage examples for ResourcePool

use resourcepool::{PoolConfiguration, PoolError, ResourcePool, TimeBudget};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug)]
struct Connection {
    id: usize,
}

fn main() {
    println!("=== resourcepool - Basic Examples ===\n");

    // Example 1: Lazy growth and reuse
    lazy_growth();

    // Example 2: Explicit release and misuse detection
    explicit_release();

    // Example 3: Disposal at teardown
    teardown();

    // Example 4: Sharing a time budget
    time_budget();
}

fn lazy_growth() {
    println!("1. Lazy Growth:");
    let pool = ResourcePool::from_fn(|| Vec::<u8>::with_capacity(1024), PoolConfiguration::default());

    {
        let _a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        println!("   Allocated while both held: {}", pool.allocated());
    }

    let _c = pool.acquire().unwrap();
    println!("   Allocated after reuse: {}", pool.allocated());
    println!("   Available: {}\n", pool.available());
}

fn explicit_release() {
    println!("2. Explicit Release:");
    let first = ResourcePool::from_fn(String::new, PoolConfiguration::default());
    let second = ResourcePool::from_fn(String::new, PoolConfiguration::default());

    let buf = first.acquire().unwrap();
    match second.release(buf) {
        Err(PoolError::InvalidRelease { resource }) => {
            println!("   Rejected foreign resource {}", resource)
        }
        other => println!("   Unexpected: {:?}", other),
    }
    println!("   First pool available again: {}\n", first.available());
}

fn teardown() {
    println!("3. Teardown:");
    let closed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&closed);
    let next_id = Mutex::new(0);

    let pool = ResourcePool::with_disposer(
        move || -> Result<Connection, String> {
            let mut id = next_id.lock().map_err(|e| e.to_string())?;
            *id += 1;
            Ok(Connection { id: *id })
        },
        move |conn: Connection| sink.lock().unwrap().push(conn.id),
        PoolConfiguration::default(),
    );

    pool.warmup(3).unwrap();
    pool.dispose();
    pool.dispose();
    println!("   Closed connections: {:?}\n", closed.lock().unwrap());
}

fn time_budget() {
    println!("4. Time Budget:");
    let budget = TimeBudget::start_new(Duration::from_millis(200));

    for step in ["resolve", "connect", "query"] {
        let slice = budget.try_acquire_time(Duration::from_millis(80));
        println!("   {step}: allowed {:?}", slice);
        std::thread::sleep(slice / 2);
    }

    println!("   Remaining: {:?}, expired: {}", budget.remaining(), budget.has_expired());
    println!("   Expired preset: {}", TimeBudget::expired().has_expired());
}
