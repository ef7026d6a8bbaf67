//! Core resource pool implementation

use crate::config::{ExhaustionPolicy, PoolConfiguration, SelectionOrder};
use crate::errors::{FactoryError, PoolError, PoolResult};
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};
use crate::time_budget::TimeBudget;

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

type Factory<T> = Box<dyn Fn() -> Result<T, FactoryError> + Send + Sync>;
type Disposer<T> = Box<dyn Fn(T) + Send + Sync>;

/// Identity of a resource within the pool that allocated it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Raw id, unique within the owning pool
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resource on loan from a [`ResourcePool`].
///
/// The caller has exclusive use of the resource but the pool keeps ownership:
/// hand it back with [`ResourcePool::release`], or just drop it.
pub struct PooledResource<T: Send + 'static> {
    value: Option<T>,
    id: ResourceId,
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> PooledResource<T> {
    pub fn id(&self) -> ResourceId {
        self.id
    }
}

impl<T: Send + 'static> Deref for PooledResource<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // Only `release` and `drop` take the value, and both consume the guard.
        self.value.as_ref().expect("Value already taken")
    }
}

impl<T: Send + 'static> DerefMut for PooledResource<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("Value already taken")
    }
}

impl<T: Send + fmt::Debug + 'static> fmt::Debug for PooledResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledResource")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}

impl<T: Send + 'static> Drop for PooledResource<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            // Failures are already logged by give_back.
            let _ = self.shared.give_back(self.id, value);
        }
    }
}

struct PoolState<T> {
    free: VecDeque<(ResourceId, T)>,
    outstanding: HashSet<ResourceId>,
    allocated: usize,
    /// Constructions running outside the lock
    pending: usize,
    next_id: u64,
    disposed: bool,
}

enum Slot<T> {
    Ready(ResourceId, T),
    Construct,
    Full(usize),
}

#[derive(Clone, Copy)]
enum Wait<'a> {
    Forever,
    Within(&'a TimeBudget),
}

struct Shared<T> {
    pool_id: u64,
    state: Mutex<PoolState<T>>,
    released: Condvar,
    released_async: Notify,
    factory: Factory<T>,
    disposer: Option<Disposer<T>>,
    config: PoolConfiguration,
    metrics: MetricsTracker,
}

/// Gives a reserved construction slot back if the factory unwinds.
struct Reservation<'a, T> {
    shared: &'a Shared<T>,
    armed: bool,
}

impl<T> Drop for Reservation<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.state.lock().pending -= 1;
            self.shared.wake();
        }
    }
}

impl<T> Shared<T> {
    fn wake(&self) {
        self.released.notify_one();
        self.released_async.notify_waiters();
    }

    fn dispose_value(&self, value: T) {
        if let Some(ref disposer) = self.disposer {
            disposer(value);
        }
    }
}

impl<T: Send + 'static> Shared<T> {
    /// Take a free resource or reserve a construction slot.
    fn claim(&self, state: &mut PoolState<T>) -> PoolResult<Slot<T>> {
        if state.disposed {
            return Err(PoolError::PoolDisposed);
        }

        let popped = match self.config.selection_order {
            SelectionOrder::Lifo => state.free.pop_back(),
            SelectionOrder::Fifo => state.free.pop_front(),
        };
        if let Some((id, value)) = popped {
            state.outstanding.insert(id);
            return Ok(Slot::Ready(id, value));
        }

        if let Some(max_size) = self.config.max_size
            && state.allocated + state.pending >= max_size
        {
            return Ok(Slot::Full(max_size));
        }

        state.pending += 1;
        Ok(Slot::Construct)
    }

    /// Run the factory for a slot reserved by `claim` and register the result.
    ///
    /// The new resource is counted as allocated but not yet placed; the caller
    /// puts it in the free set or the outstanding set before unlocking.
    fn construct(&self) -> PoolResult<(MutexGuard<'_, PoolState<T>>, ResourceId, T)> {
        let mut reservation = Reservation { shared: self, armed: true };
        let result = (self.factory)();
        reservation.armed = false;

        let mut state = self.state.lock();
        state.pending -= 1;

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                drop(state);
                self.wake();
                MetricsTracker::increment(&self.metrics.construction_failures);
                warn!(pool_id = self.pool_id, error = %err, "Resource construction failed");
                return Err(PoolError::construction_failed(err));
            }
        };

        if state.disposed {
            drop(state);
            self.dispose_value(value);
            return Err(PoolError::PoolDisposed);
        }

        let id = ResourceId(state.next_id);
        state.next_id += 1;
        state.allocated += 1;
        debug!(pool_id = self.pool_id, resource = %id, allocated = state.allocated, "Constructed resource");

        Ok((state, id, value))
    }

    fn hand_out(self: &Arc<Self>, id: ResourceId, value: T) -> PooledResource<T> {
        MetricsTracker::increment(&self.metrics.total_acquired);
        PooledResource {
            value: Some(value),
            id,
            shared: Arc::clone(self),
        }
    }

    fn construct_and_hand_out(self: &Arc<Self>) -> PoolResult<PooledResource<T>> {
        let (mut state, id, value) = self.construct()?;
        state.outstanding.insert(id);
        drop(state);
        Ok(self.hand_out(id, value))
    }

    fn acquire(self: &Arc<Self>, wait: Wait<'_>) -> PoolResult<PooledResource<T>> {
        let mut state = self.state.lock();
        loop {
            match self.claim(&mut state)? {
                Slot::Ready(id, value) => {
                    drop(state);
                    debug!(pool_id = self.pool_id, resource = %id, "Reusing resource");
                    return Ok(self.hand_out(id, value));
                }
                Slot::Construct => {
                    drop(state);
                    return self.construct_and_hand_out();
                }
                Slot::Full(max_size) => {
                    if self.config.exhaustion_policy == ExhaustionPolicy::FailFast {
                        drop(state);
                        return Err(self.exhausted(max_size));
                    }
                    match wait {
                        Wait::Forever => self.released.wait(&mut state),
                        Wait::Within(budget) => {
                            let remaining = budget.remaining();
                            if remaining.is_zero() {
                                drop(state);
                                return Err(self.timed_out(budget));
                            }
                            self.released.wait_for(&mut state, remaining);
                        }
                    }
                }
            }
        }
    }

    async fn acquire_async(self: &Arc<Self>, wait: Wait<'_>) -> PoolResult<PooledResource<T>> {
        loop {
            // Registered before the claim so a release in between still wakes us.
            let notified = self.released_async.notified();

            let max_size = {
                let mut state = self.state.lock();
                match self.claim(&mut state)? {
                    Slot::Ready(id, value) => {
                        drop(state);
                        debug!(pool_id = self.pool_id, resource = %id, "Reusing resource");
                        return Ok(self.hand_out(id, value));
                    }
                    Slot::Construct => {
                        drop(state);
                        return self.construct_and_hand_out();
                    }
                    Slot::Full(max_size) => max_size,
                }
            };

            if self.config.exhaustion_policy == ExhaustionPolicy::FailFast {
                return Err(self.exhausted(max_size));
            }

            match wait {
                Wait::Forever => notified.await,
                Wait::Within(budget) => {
                    let remaining = budget.remaining();
                    if remaining.is_zero() {
                        return Err(self.timed_out(budget));
                    }
                    // On timeout, loop once more: the budget check above ends it.
                    let _ = tokio::time::timeout(remaining, notified).await;
                }
            }
        }
    }

    fn give_back(&self, id: ResourceId, value: T) -> PoolResult<()> {
        let mut state = self.state.lock();

        if state.disposed {
            state.outstanding.remove(&id);
            drop(state);
            debug!(pool_id = self.pool_id, resource = %id, "Returned to disposed pool, disposing resource");
            self.dispose_value(value);
            return Err(PoolError::PoolDisposed);
        }

        if !state.outstanding.remove(&id) {
            drop(state);
            MetricsTracker::increment(&self.metrics.invalid_releases);
            warn!(pool_id = self.pool_id, resource = %id, "Release of a resource that is not outstanding");
            return Err(PoolError::InvalidRelease { resource: id });
        }

        state.free.push_back((id, value));
        let available = state.free.len();
        drop(state);

        MetricsTracker::increment(&self.metrics.total_released);
        debug!(pool_id = self.pool_id, resource = %id, available, "Released resource");
        self.wake();
        Ok(())
    }

    fn dispose(&self) {
        let (drained, outstanding) = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            let drained: Vec<_> = state.free.drain(..).collect();
            (drained, state.outstanding.len())
        };

        info!(
            pool_id = self.pool_id,
            disposed = drained.len(),
            outstanding,
            "Disposing pool"
        );

        for (_, value) in drained {
            self.dispose_value(value);
        }

        self.released.notify_all();
        self.released_async.notify_waiters();
    }

    fn exhausted(&self, max_size: usize) -> PoolError {
        MetricsTracker::increment(&self.metrics.exhausted_events);
        PoolError::Exhausted { max_size }
    }

    fn timed_out(&self, budget: &TimeBudget) -> PoolError {
        MetricsTracker::increment(&self.metrics.timeouts);
        debug!(pool_id = self.pool_id, budget = ?budget.budget(), "Acquire timed out");
        PoolError::Timeout(budget.budget())
    }
}

/// A started copy of `budget` if it has not been started yet.
fn started_budget(budget: &TimeBudget) -> Option<TimeBudget> {
    (!budget.is_started())
        .then(|| TimeBudget::start_new_with_precision(budget.remaining(), budget.precision()))
}

/// Thread-safe pool of reusable resources built on demand by a factory.
///
/// Free resources are reused before new ones are constructed. Every resource
/// the pool allocates stays owned by it until [`dispose`](Self::dispose),
/// which also runs when the pool is dropped.
///
/// # Examples
///
/// ```
/// use resourcepool::{PoolConfiguration, ResourcePool};
///
/// let pool = ResourcePool::from_fn(|| Vec::<u8>::with_capacity(1024), PoolConfiguration::default());
///
/// let mut buf = pool.acquire().unwrap();
/// buf.extend_from_slice(b"hello");
/// pool.release(buf).unwrap();
///
/// assert_eq!(pool.allocated(), 1);
/// assert_eq!(pool.available(), 1);
/// ```
pub struct ResourcePool<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> ResourcePool<T> {
    /// Create a pool with a fallible factory
    pub fn new<F, E>(factory: F, config: PoolConfiguration) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<FactoryError>,
    {
        Self::build(
            Box::new(move || -> Result<T, FactoryError> { factory().map_err(Into::into) }),
            None,
            config,
        )
    }

    /// Create a pool whose resources are passed to `disposer` at teardown
    pub fn with_disposer<F, E, D>(factory: F, disposer: D, config: PoolConfiguration) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<FactoryError>,
        D: Fn(T) + Send + Sync + 'static,
    {
        Self::build(
            Box::new(move || -> Result<T, FactoryError> { factory().map_err(Into::into) }),
            Some(Box::new(disposer) as Disposer<T>),
            config,
        )
    }

    /// Create a pool with a factory that cannot fail
    pub fn from_fn<F>(factory: F, config: PoolConfiguration) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(
            Box::new(move || -> Result<T, FactoryError> { Ok(factory()) }),
            None,
            config,
        )
    }

    fn build(factory: Factory<T>, disposer: Option<Disposer<T>>, config: PoolConfiguration) -> Self {
        let pool_id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        debug!(pool_id, max_size = ?config.max_size, "Created resource pool");

        Self {
            shared: Arc::new(Shared {
                pool_id,
                state: Mutex::new(PoolState {
                    free: VecDeque::new(),
                    outstanding: HashSet::new(),
                    allocated: 0,
                    pending: 0,
                    next_id: 0,
                    disposed: false,
                }),
                released: Condvar::new(),
                released_async: Notify::new(),
                factory,
                disposer,
                config,
                metrics: MetricsTracker::new(),
            }),
        }
    }

    /// Acquire a resource, constructing one if none is free.
    ///
    /// A bounded pool at its limit waits for a release, for at most the
    /// configured `acquire_timeout` when one is set.
    pub fn acquire(&self) -> PoolResult<PooledResource<T>> {
        match self.shared.config.acquire_timeout {
            Some(timeout) => self.acquire_within(&TimeBudget::start_new(timeout)),
            None => self.shared.acquire(Wait::Forever),
        }
    }

    /// Acquire a resource, waiting at most for what is left of `budget`.
    ///
    /// A budget that was never started is measured from the start of this
    /// call, so [`TimeBudget::infinite`] waits for up to an hour.
    pub fn acquire_within(&self, budget: &TimeBudget) -> PoolResult<PooledResource<T>> {
        let started = started_budget(budget);
        self.shared.acquire(Wait::Within(started.as_ref().unwrap_or(budget)))
    }

    /// Acquire without waiting
    pub fn try_acquire(&self) -> Option<PooledResource<T>> {
        self.acquire_within(&TimeBudget::expired()).ok()
    }

    /// Acquire asynchronously
    pub async fn acquire_async(&self) -> PoolResult<PooledResource<T>> {
        match self.shared.config.acquire_timeout {
            Some(timeout) => {
                let budget = TimeBudget::start_new(timeout);
                self.shared.acquire_async(Wait::Within(&budget)).await
            }
            None => self.shared.acquire_async(Wait::Forever).await,
        }
    }

    /// Acquire asynchronously, waiting at most for what is left of `budget`.
    ///
    /// An unstarted budget is measured from the start of this call, as in
    /// [`acquire_within`](Self::acquire_within).
    pub async fn acquire_within_async(&self, budget: &TimeBudget) -> PoolResult<PooledResource<T>> {
        let started = started_budget(budget);
        self.shared
            .acquire_async(Wait::Within(started.as_ref().unwrap_or(budget)))
            .await
    }

    /// Return a resource to the pool.
    ///
    /// A handle that belongs to another pool is rejected with
    /// [`PoolError::InvalidRelease`] and goes back to its own pool.
    pub fn release(&self, mut resource: PooledResource<T>) -> PoolResult<()> {
        if !Arc::ptr_eq(&resource.shared, &self.shared) {
            MetricsTracker::increment(&self.shared.metrics.invalid_releases);
            warn!(
                pool_id = self.shared.pool_id,
                owner_pool_id = resource.shared.pool_id,
                resource = %resource.id,
                "Release of a resource acquired from another pool"
            );
            return Err(PoolError::InvalidRelease { resource: resource.id });
        }

        match resource.value.take() {
            Some(value) => self.shared.give_back(resource.id, value),
            None => Err(PoolError::InvalidRelease { resource: resource.id }),
        }
    }

    /// Pre-construct up to `count` free resources, stopping at `max_size`.
    ///
    /// Returns how many were created. The first factory error aborts the
    /// warm-up and is returned.
    pub fn warmup(&self, count: usize) -> PoolResult<usize> {
        let mut created = 0;
        while created < count {
            {
                let mut state = self.shared.state.lock();
                if state.disposed {
                    return Err(PoolError::PoolDisposed);
                }
                if let Some(max_size) = self.shared.config.max_size
                    && state.allocated + state.pending >= max_size
                {
                    break;
                }
                state.pending += 1;
            }
            let (mut state, id, value) = self.shared.construct()?;
            state.free.push_back((id, value));
            created += 1;
        }

        debug!(pool_id = self.shared.pool_id, created, "Warmed up pool");
        // New free resources may unblock waiters.
        self.shared.released.notify_all();
        self.shared.released_async.notify_waiters();
        Ok(created)
    }

    /// Tear the pool down, disposing every free resource.
    ///
    /// Resources still on loan are disposed when they come back. Calling this
    /// more than once has no further effect.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }

    /// Total resources ever constructed by this pool
    pub fn allocated(&self) -> usize {
        self.shared.state.lock().allocated
    }

    /// Resources currently free for reuse
    pub fn available(&self) -> usize {
        self.shared.state.lock().free.len()
    }

    /// Resources currently on loan
    pub fn outstanding(&self) -> usize {
        self.shared.state.lock().outstanding.len()
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        let (allocated, available, outstanding) = {
            let state = self.shared.state.lock();
            (state.allocated, state.free.len(), state.outstanding.len())
        };
        self.shared.metrics.get_metrics(
            allocated,
            available,
            outstanding,
            self.shared.config.max_size,
        )
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }
}

impl<T: Send + 'static> Drop for ResourcePool<T> {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

impl<T: Send + 'static> fmt::Debug for ResourcePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ResourcePool")
            .field("pool_id", &self.shared.pool_id)
            .field("allocated", &state.allocated)
            .field("available", &state.free.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}
