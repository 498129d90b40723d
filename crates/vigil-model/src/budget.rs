use std::{thread, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Default number of prefork workers: `2 × available parallelism + 1`.
pub fn default_worker_count() -> usize {
    let cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    cpus * 2 + 1
}

/// Resource budget of the prefork worker pool.
///
/// A worker is retired and replaced after serving `max_requests` plus a
/// random share of `max_requests_jitter` requests; the jitter keeps workers
/// from being recycled all at once. `max_requests = 0` disables recycling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerBudget {
    /// Number of worker processes (must be at least 1).
    pub workers: usize,
    /// Requests served before a worker is recycled.
    pub max_requests: u64,
    /// Upper bound of the random extra requests added per worker.
    pub max_requests_jitter: u64,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of requests a worker handles concurrently.
    pub worker_connections: usize,
    /// Time workers get to finish after a stop request, in milliseconds.
    pub graceful_timeout_ms: u64,
}

impl WorkerBudget {
    pub const DEFAULT_MAX_REQUESTS: u64 = 1_000;
    pub const DEFAULT_JITTER: u64 = 50;
    pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;
    pub const DEFAULT_WORKER_CONNECTIONS: usize = 1_000;
    pub const DEFAULT_GRACEFUL_TIMEOUT_MS: u64 = 30_000;

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[inline]
    pub fn graceful_timeout(&self) -> Duration {
        Duration::from_millis(self.graceful_timeout_ms)
    }

    /// Request budget of one worker given a jitter sample.
    ///
    /// The sample is clamped to `max_requests_jitter`. Returns `None` when
    /// recycling is disabled.
    pub fn requests_for(&self, jitter_sample: u64) -> Option<u64> {
        if self.max_requests == 0 {
            return None;
        }
        Some(
            self.max_requests
                .saturating_add(jitter_sample.min(self.max_requests_jitter)),
        )
    }

    /// Rules:
    /// - at least one worker;
    /// - at least one concurrent connection per worker;
    /// - non-zero request timeout.
    pub fn validate(&self) -> ModelResult<()> {
        if self.workers == 0 {
            return Err(ModelError::InvalidBudget("workers must be >= 1".into()));
        }
        if self.worker_connections == 0 {
            return Err(ModelError::InvalidBudget(
                "worker_connections must be >= 1".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ModelError::InvalidBudget(
                "request timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for WorkerBudget {
    fn default() -> Self {
        Self {
            workers: default_worker_count(),
            max_requests: Self::DEFAULT_MAX_REQUESTS,
            max_requests_jitter: Self::DEFAULT_JITTER,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            worker_connections: Self::DEFAULT_WORKER_CONNECTIONS,
            graceful_timeout_ms: Self::DEFAULT_GRACEFUL_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_worker_count_is_odd_and_positive() {
        let n = default_worker_count();
        assert!(n >= 3);
        assert_eq!(n % 2, 1);
    }

    #[test]
    fn defaults_follow_deployment_values() {
        let b = WorkerBudget::default();
        assert_eq!(b.max_requests, 1_000);
        assert_eq!(b.max_requests_jitter, 50);
        assert_eq!(b.timeout(), Duration::from_secs(120));
        assert_eq!(b.worker_connections, 1_000);
        assert!(b.validate().is_ok());
    }

    #[test]
    fn requests_for_clamps_jitter() {
        let b = WorkerBudget {
            max_requests: 100,
            max_requests_jitter: 10,
            ..WorkerBudget::default()
        };
        assert_eq!(b.requests_for(0), Some(100));
        assert_eq!(b.requests_for(7), Some(107));
        assert_eq!(b.requests_for(1_000), Some(110));
    }

    #[test]
    fn zero_max_requests_disables_recycling() {
        let b = WorkerBudget {
            max_requests: 0,
            ..WorkerBudget::default()
        };
        assert_eq!(b.requests_for(5), None);
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let b = WorkerBudget {
            workers: 0,
            ..WorkerBudget::default()
        };
        assert!(matches!(b.validate(), Err(ModelError::InvalidBudget(_))));
    }

    #[test]
    fn serde_roundtrip() {
        let b = WorkerBudget {
            workers: 4,
            ..WorkerBudget::default()
        };
        let json = serde_json::to_string(&b).unwrap();
        let back: WorkerBudget = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
