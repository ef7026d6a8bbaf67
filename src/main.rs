// resourcepool demo binary
// Run examples with: cargo run --example basic
// Set RUST_LOG=resourcepool=debug to watch the pool at work

use resourcepool::{PoolConfiguration, ResourcePool, TimeBudget};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== resourcepool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    // Quick demo
    println!("Quick Demo:");
    let pool = ResourcePool::from_fn(|| vec![0u8; 4096], PoolConfiguration::new().with_max_size(2));

    {
        let budget = TimeBudget::start_new(Duration::from_millis(250));
        match pool.acquire_within(&budget) {
            Ok(buf) => println!("  Got buffer {} ({} bytes)", buf.id(), buf.len()),
            Err(err) => println!("  Acquire failed: {}", err),
        }
    }

    println!("  Allocated: {}, available: {}", pool.allocated(), pool.available());
    pool.dispose();
}
