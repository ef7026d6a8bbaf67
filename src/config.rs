//! Pool configuration options

use std::time::Duration;

/// What a bounded pool does when every slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// Wait for a release, bounded by the acquire budget
    #[default]
    Block,

    /// Return [`PoolError::Exhausted`](crate::PoolError::Exhausted) immediately
    FailFast,
}

/// Order in which free resources are handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionOrder {
    /// Most recently released first
    #[default]
    Lifo,

    /// Least recently released first
    Fifo,
}

/// Configuration for resource pool behavior
///
/// # Examples
///
/// ```
/// use resourcepool::{ExhaustionPolicy, PoolConfiguration};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_max_size(8)
///     .with_acquire_timeout(Duration::from_secs(2))
///     .with_exhaustion_policy(ExhaustionPolicy::Block);
///
/// assert_eq!(config.max_size, Some(8));
/// assert_eq!(config.acquire_timeout, Some(Duration::from_secs(2)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoolConfiguration {
    /// Upper bound on allocated resources; `None` lets the pool grow freely
    pub max_size: Option<usize>,

    /// Behaviour of a bounded pool at its limit
    pub exhaustion_policy: ExhaustionPolicy,

    /// Default wait bound for `acquire` on a bounded pool
    pub acquire_timeout: Option<Duration>,

    pub selection_order: SelectionOrder,
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of resources the pool may allocate
    ///
    /// # Examples
    ///
    /// ```
    /// use resourcepool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_max_size(50);
    ///
    /// assert_eq!(config.max_size, Some(50));
    /// ```
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = Some(size);
        self
    }

    pub fn with_exhaustion_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.exhaustion_policy = policy;
        self
    }

    /// Set the default acquire timeout
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Set the free-set selection order
    pub fn with_selection_order(mut self, order: SelectionOrder) -> Self {
        self.selection_order = order;
        self
    }
}
