use std::sync::Arc;

/// How one unit of work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Work returned `Ok`.
    Success,
    /// Work returned an error.
    Failure,
    /// Work panicked.
    Panicked,
}

impl CycleOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            CycleOutcome::Success => "success",
            CycleOutcome::Failure => "failure",
            CycleOutcome::Panicked => "panicked",
        }
    }
}

/// Backend metrics collection interface.
///
/// Every call is labelled with the lock name, so several coordinated tasks
/// in one process stay distinguishable.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record a finished unit of work.
    ///
    /// # Arguments
    /// - `lock`: Lock guarding the work
    /// - `outcome`: How the work ended
    /// - `duration_ms`: Execution time in milliseconds
    fn record_cycle(&self, lock: &str, outcome: CycleOutcome, duration_ms: u64);

    /// Record a lock attempt lost to another holder.
    fn record_contention(&self, lock: &str);

    /// Record a lock store failure during acquire.
    fn record_store_error(&self, lock: &str);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
