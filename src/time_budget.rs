//! Time budgets for bounding waits and downstream work

use parking_lot::RwLock;
use std::time::{Duration, Instant};

/// Remaining time below this is reported as zero unless configured otherwise.
pub const DEFAULT_PRECISION: Duration = Duration::from_millis(5);

/// Total of the [`TimeBudget::infinite`] preset.
pub const INFINITE_BUDGET: Duration = Duration::from_secs(60 * 60);

/// A shared notion of "how much time is left".
///
/// The budget only measures wall-clock time since [`start`](Self::start);
/// it is not a spend-down ledger, so handing out time through
/// [`try_acquire_time`](Self::try_acquire_time) does not consume it.
///
/// # Examples
///
/// ```
/// use resourcepool::TimeBudget;
/// use std::time::Duration;
///
/// let budget = TimeBudget::start_new(Duration::from_secs(10));
/// assert!(!budget.has_expired());
/// assert!(budget.remaining() <= Duration::from_secs(10));
///
/// let step = budget.try_acquire_time(Duration::from_secs(1));
/// assert_eq!(step, Duration::from_secs(1));
/// ```
#[derive(Debug)]
pub struct TimeBudget {
    budget: Duration,
    precision: Duration,
    started_at: RwLock<Option<Instant>>,
}

impl TimeBudget {
    /// Create a budget that has not been started yet
    pub fn new(budget: Duration) -> Self {
        Self::with_precision(budget, DEFAULT_PRECISION)
    }

    pub fn with_precision(budget: Duration, precision: Duration) -> Self {
        Self {
            budget,
            precision,
            started_at: RwLock::new(None),
        }
    }

    /// Create and start a budget
    pub fn start_new(budget: Duration) -> Self {
        Self::new(budget).start()
    }

    pub fn start_new_with_precision(budget: Duration, precision: Duration) -> Self {
        Self::with_precision(budget, precision).start()
    }

    /// Create and start a budget given in milliseconds
    pub fn start_new_ms(budget_ms: u64) -> Self {
        Self::start_new(Duration::from_millis(budget_ms))
    }

    /// An hour-long budget that is never started, so it never runs down.
    pub fn infinite() -> Self {
        Self::new(INFINITE_BUDGET)
    }

    /// A zero budget; expired even before it is started.
    pub fn expired() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Start measuring time
    pub fn start(self) -> Self {
        self.restart();
        self
    }

    /// Reset the clock to now. Starting an already started budget is the same
    /// as restarting it.
    pub fn restart(&self) {
        *self.started_at.write() = Some(Instant::now());
    }

    pub fn is_started(&self) -> bool {
        self.started_at.read().is_some()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn precision(&self) -> Duration {
        self.precision
    }

    /// Time since the budget was started, zero if it never was
    pub fn elapsed(&self) -> Duration {
        match *self.started_at.read() {
            Some(started) => started.elapsed(),
            None => Duration::ZERO,
        }
    }

    /// Time left, clamped to zero once it drops below the precision
    pub fn remaining(&self) -> Duration {
        self.remaining_after(self.elapsed())
    }

    pub fn has_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Clamp `needed` to what is left in the budget
    pub fn try_acquire_time(&self, needed: Duration) -> Duration {
        needed.min(self.remaining())
    }

    fn remaining_after(&self, elapsed: Duration) -> Duration {
        let remaining = self.budget.saturating_sub(elapsed);
        if remaining < self.precision {
            Duration::ZERO
        } else {
            remaining
        }
    }
}
