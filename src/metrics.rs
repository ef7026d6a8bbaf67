//! Metrics collection and export for resource pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use resourcepool::{PoolConfiguration, ResourcePool};
///
/// let pool = ResourcePool::from_fn(|| vec![0u8; 16], PoolConfiguration::default());
///
/// {
///     let _buf = pool.acquire().unwrap();
///     let metrics = pool.get_metrics();
///     assert_eq!(metrics.total_acquired, 1);
///     assert_eq!(metrics.outstanding, 1);
/// }
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Resources ever constructed by the pool
    pub allocated: usize,

    /// Resources currently free for reuse
    pub available: usize,

    /// Resources currently held by callers
    pub outstanding: usize,

    pub total_acquired: usize,

    pub total_released: usize,

    /// Factory invocations that returned an error
    pub construction_failures: usize,

    pub invalid_releases: usize,

    /// Acquires that ran out of budget
    pub timeouts: usize,

    /// Acquires rejected by a full fail-fast pool
    pub exhausted_events: usize,

    /// Outstanding share of capacity (0.0 to 1.0)
    pub utilization: f64,

    /// Configured cap, if any
    pub max_size: Option<usize>,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("allocated".to_string(), self.allocated.to_string());
        metrics.insert("available".to_string(), self.available.to_string());
        metrics.insert("outstanding".to_string(), self.outstanding.to_string());
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("construction_failures".to_string(), self.construction_failures.to_string());
        metrics.insert("invalid_releases".to_string(), self.invalid_releases.to_string());
        metrics.insert("timeouts".to_string(), self.timeouts.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        if let Some(max_size) = self.max_size {
            metrics.insert("max_size".to_string(), max_size.to_string());
        }
        metrics
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use resourcepool::{PoolConfiguration, ResourcePool};
    /// use std::collections::HashMap;
    ///
    /// let pool = ResourcePool::from_fn(String::new, PoolConfiguration::default());
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("buffers", Some(&tags));
    /// assert!(output.contains("resourcepool_allocated"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        // Gauge metrics
        Self::write_metric(&mut output, &labels, "allocated", "gauge", "Resources allocated by the pool", metrics.allocated);
        Self::write_metric(&mut output, &labels, "available", "gauge", "Resources free for reuse", metrics.available);
        Self::write_metric(&mut output, &labels, "outstanding", "gauge", "Resources held by callers", metrics.outstanding);

        output.push_str("# HELP resourcepool_utilization Pool utilization ratio\n");
        output.push_str("# TYPE resourcepool_utilization gauge\n");
        output.push_str(&format!("resourcepool_utilization{{{}}} {:.2}\n", labels, metrics.utilization));

        // Counter metrics
        Self::write_metric(&mut output, &labels, "acquired_total", "counter", "Total resources acquired", metrics.total_acquired);
        Self::write_metric(&mut output, &labels, "released_total", "counter", "Total resources released", metrics.total_released);
        Self::write_metric(&mut output, &labels, "construction_failures_total", "counter", "Factory failures", metrics.construction_failures);
        Self::write_metric(&mut output, &labels, "invalid_releases_total", "counter", "Rejected releases", metrics.invalid_releases);
        Self::write_metric(&mut output, &labels, "timeouts_total", "counter", "Acquires that timed out", metrics.timeouts);
        Self::write_metric(&mut output, &labels, "exhausted_total", "counter", "Acquires rejected by a full pool", metrics.exhausted_events);

        output
    }

    fn write_metric(output: &mut String, labels: &str, name: &str, kind: &str, help: &str, value: usize) {
        output.push_str(&format!("# HELP resourcepool_{} {}\n", name, help));
        output.push_str(&format!("# TYPE resourcepool_{} {}\n", name, kind));
        output.push_str(&format!("resourcepool_{}{{{}}} {}\n", name, labels, value));
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            let mut tags: Vec<_> = tags.iter().collect();
            tags.sort();
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub total_released: AtomicUsize,
    pub construction_failures: AtomicUsize,
    pub invalid_releases: AtomicUsize,
    pub timeouts: AtomicUsize,
    pub exhausted_events: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(
        &self,
        allocated: usize,
        available: usize,
        outstanding: usize,
        max_size: Option<usize>,
    ) -> PoolMetrics {
        let capacity = max_size.unwrap_or(allocated);
        let utilization = if capacity > 0 {
            outstanding as f64 / capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            allocated,
            available,
            outstanding,
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            construction_failures: self.construction_failures.load(Ordering::Relaxed),
            invalid_releases: self.invalid_releases.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            exhausted_events: self.exhausted_events.load(Ordering::Relaxed),
            utilization,
            max_size,
        }
    }
}
