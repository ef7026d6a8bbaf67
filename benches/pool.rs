use criterion::{Criterion, black_box, criterion_group, criterion_main};
use resourcepool::{PoolConfiguration, ResourcePool, TimeBudget};
use std::time::Duration;

fn acquire_release(c: &mut Criterion) {
    let pool = ResourcePool::from_fn(|| vec![0u8; 4096], PoolConfiguration::default());
    pool.warmup(1).unwrap();

    c.bench_function("acquire_release_warm", |b| {
        b.iter(|| {
            let buf = pool.acquire().unwrap();
            black_box(buf.len());
        })
    });

    let bounded = ResourcePool::from_fn(|| vec![0u8; 4096], PoolConfiguration::new().with_max_size(1));
    c.bench_function("acquire_within_bounded", |b| {
        b.iter(|| {
            let budget = TimeBudget::start_new(Duration::from_millis(10));
            let buf = bounded.acquire_within(&budget).unwrap();
            black_box(buf.len());
        })
    });
}

fn time_budget(c: &mut Criterion) {
    let budget = TimeBudget::start_new(Duration::from_secs(60));
    c.bench_function("time_budget_remaining", |b| b.iter(|| black_box(budget.remaining())));
}

criterion_group!(benches, acquire_release, time_budget);
criterion_main!(benches);
