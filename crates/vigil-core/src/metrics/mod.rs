//! Metrics abstraction for coordinated tasks.
//!
//! Backends (prometheus, statsd, etc) implement [`MetricsBackend`] and are
//! handed to [`crate::CoordinatedTask::with_metrics`]. Without one the task
//! reports into [`NoOpMetrics`].
mod backend;
pub use backend::{CycleOutcome, MetricsBackend, MetricsHandle};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
