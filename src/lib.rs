//! # resourcepool
//!
//! Thread-safe pool of reusable, expensive-to-construct resources, with
//! acquisition bounded by a [`TimeBudget`].
//!
//! ## Features
//!
//! - Lazy growth: resources are built by a factory only when none is free
//! - Free resources are reused before new ones are allocated (LIFO or FIFO)
//! - Checked release: handles from another pool are rejected
//! - Automatic return of resources via RAII (Drop trait)
//! - Optional size cap, blocking or failing fast when exhausted
//! - Sync and async acquire bounded by a time budget
//! - Centralised disposal of every allocated resource at teardown
//! - Metrics and Prometheus text export
//!
//! ## Quick Start
//!
//! ```rust
//! use resourcepool::{PoolConfiguration, ResourcePool, TimeBudget};
//! use std::time::Duration;
//!
//! let pool = ResourcePool::from_fn(|| String::with_capacity(256), PoolConfiguration::default());
//! {
//!     let budget = TimeBudget::start_new(Duration::from_millis(100));
//!     let mut buf = pool.acquire_within(&budget).unwrap();
//!     buf.push_str("scratch");
//!     // Resource automatically returned when `buf` goes out of scope
//! }
//! assert_eq!(pool.available(), 1);
//! ```

mod config;
mod errors;
mod metrics;
mod pool;
mod time_budget;

pub use config::{ExhaustionPolicy, PoolConfiguration, SelectionOrder};
pub use errors::{FactoryError, PoolError, PoolResult};
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::{PooledResource, ResourceId, ResourcePool};
pub use time_budget::{DEFAULT_PRECISION, INFINITE_BUDGET, TimeBudget};
