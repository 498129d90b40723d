use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Declarative description of a named distributed lock.
///
/// The lock store enforces mutual exclusion on `name`; `timeout_ms` is the
/// expiry of every holding, so a holder that dies without releasing never
/// wedges its competitors for longer than the timeout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSpec {
    /// Key under which the lock lives in the shared store.
    pub name: String,
    /// Expiry of a holding in milliseconds.
    pub timeout_ms: u64,
}

impl LockSpec {
    /// Default expiry used by the progress-update lock.
    pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

    pub fn new(name: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            name: name.into(),
            timeout_ms,
        }
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Rules:
    /// - `name` is not empty or whitespace-only;
    /// - `timeout_ms` is non-zero (a lock without expiry breaks liveness).
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::InvalidLock("lock name is empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ModelError::InvalidLock(format!(
                "lock '{}' must have a non-zero timeout",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_converts_to_duration() {
        let spec = LockSpec::new("update_progress", 60_000);
        assert_eq!(spec.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn validate_rejects_empty_name_and_zero_timeout() {
        assert!(LockSpec::new("  ", 1_000).validate().is_err());
        assert!(LockSpec::new("update_progress", 0).validate().is_err());
        assert!(LockSpec::new("update_progress", 1).validate().is_ok());
    }

    #[test]
    fn serde_uses_camel_case() {
        let spec = LockSpec::new("update_progress", 5_000);
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, r#"{"name":"update_progress","timeoutMs":5000}"#);
    }
}
