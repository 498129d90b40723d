use crate::metrics::backend::{CycleOutcome, MetricsBackend};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_cycle(&self, _: &str, _: CycleOutcome, _: u64) {}

    #[inline(always)]
    fn record_contention(&self, _: &str) {}

    #[inline(always)]
    fn record_store_error(&self, _: &str) {}
}
