use std::sync::Arc;

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder, proto::MetricFamily};

use vigil_core::{CycleOutcome, MetricsBackend};

const NAMESPACE: &str = "vigil";

/// Prometheus metrics backend for vigil.
///
/// ## Label cardinality
/// All labels are bounded:
/// - `lock`: configured lock names (usually one)
/// - `outcome`: "success", "failure", "panicked"
#[derive(Clone)]
pub struct PrometheusMetrics {
    cycles: CounterVec,
    cycle_duration: HistogramVec,
    contention: CounterVec,
    store_errors: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a new prometheus metrics backend with custom registry.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let cycles = CounterVec::new(
            Opts::new("cycles_total", "Units of work run under the lock").namespace(NAMESPACE),
            &["lock", "outcome"],
        )?;
        registry.register(Box::new(cycles.clone()))?;

        let cycle_duration = HistogramVec::new(
            HistogramOpts::new("cycle_duration_seconds", "Unit of work duration in seconds")
                .namespace(NAMESPACE)
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]),
            &["lock"],
        )?;
        registry.register(Box::new(cycle_duration.clone()))?;

        let contention = CounterVec::new(
            Opts::new("lock_contention_total", "Lock attempts lost to another holder")
                .namespace(NAMESPACE),
            &["lock"],
        )?;
        registry.register(Box::new(contention.clone()))?;

        let store_errors = CounterVec::new(
            Opts::new("lock_store_errors_total", "Lock store failures during acquire")
                .namespace(NAMESPACE),
            &["lock"],
        )?;
        registry.register(Box::new(store_errors.clone()))?;

        Ok(Self {
            cycles,
            cycle_duration,
            contention,
            store_errors,
            registry,
        })
    }

    /// Create a new prometheus metrics backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metrics for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }

    /// Content type matching [`PrometheusMetrics::encode`].
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_cycle(&self, lock: &str, outcome: CycleOutcome, duration_ms: u64) {
        self.cycles
            .with_label_values(&[lock, outcome.as_label()])
            .inc();

        let duration_seconds = duration_ms as f64 / 1000.0;
        self.cycle_duration
            .with_label_values(&[lock])
            .observe(duration_seconds);
    }

    fn record_contention(&self, lock: &str) {
        self.contention.with_label_values(&[lock]).inc();
    }

    fn record_store_error(&self, lock: &str) {
        self.store_errors.with_label_values(&[lock]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn record_cycle_counts_by_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_cycle("update_progress", CycleOutcome::Success, 150);
        metrics.record_cycle("update_progress", CycleOutcome::Success, 20);
        metrics.record_cycle("update_progress", CycleOutcome::Panicked, 5);

        let families = metrics.gather();
        assert_eq!(family(&families, "vigil_cycles_total").get_metric().len(), 2);
        assert_eq!(
            family(&families, "vigil_cycle_duration_seconds")
                .get_metric()
                .len(),
            1
        );
    }

    #[test]
    fn contention_and_store_errors_are_counted_per_lock() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_contention("update_progress");
        metrics.record_contention("cleanup");
        metrics.record_store_error("update_progress");

        let families = metrics.gather();
        assert_eq!(family(&families, "vigil_lock_contention_total").get_metric().len(), 2);
        assert_eq!(family(&families, "vigil_lock_store_errors_total").get_metric().len(), 1);
    }

    #[test]
    fn encode_renders_text_format() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_contention("update_progress");

        let body = metrics.encode().unwrap();
        assert!(body.contains("vigil_lock_contention_total{lock=\"update_progress\"} 1"));
        assert!(metrics.content_type().starts_with("text/plain"));
    }

    #[test]
    fn can_use_custom_registry() {
        let registry = Arc::new(Registry::new());
        let metrics = PrometheusMetrics::new_with_registry(registry.clone()).unwrap();

        metrics.record_contention("update_progress");
        assert!(!registry.gather().is_empty());
    }
}
