use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Timing policy of the periodic coordinated task.
///
/// - `interval_ms`: interruptible wait after each unit of work.
/// - `contention_backoff_ms`: pause between failed lock attempts; `0` re-polls
///   immediately (the loop still yields to the runtime).
/// - `hold_through_wait`: keep the lock during the wait and release it
///   afterwards, limiting the whole fleet to one unit of work per interval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskSchedule {
    pub interval_ms: u64,
    pub contention_backoff_ms: u64,
    pub hold_through_wait: bool,
}

impl TaskSchedule {
    pub const DEFAULT_INTERVAL_MS: u64 = 6_000;

    /// Schedule with the given interval and default contention handling.
    pub fn every(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            ..Self::default()
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Returns `None` when failed attempts should re-poll immediately.
    #[inline]
    pub fn contention_backoff(&self) -> Option<Duration> {
        (self.contention_backoff_ms > 0).then(|| Duration::from_millis(self.contention_backoff_ms))
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.interval_ms == 0 {
            return Err(ModelError::InvalidSchedule(
                "interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TaskSchedule {
    fn default() -> Self {
        Self {
            interval_ms: Self::DEFAULT_INTERVAL_MS,
            contention_backoff_ms: 0,
            hold_through_wait: false,
        }
    }
}
