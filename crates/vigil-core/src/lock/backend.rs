use std::{fmt, sync::Arc};

use crate::lock::{LockError, LockStoreHandle, MemoryLockStore};

/// Where lock holdings live.
///
/// Resolved from configuration and connected separately in every serving
/// process, so prefork workers each open their own connection.
#[derive(Clone, PartialEq, Eq)]
pub enum LockBackend {
    /// Process-local store; only tasks of one process are coordinated.
    Memory,
    /// Shared Redis store at `url`.
    Redis { url: String },
}

impl LockBackend {
    /// Redis when a non-empty URL is configured, memory otherwise.
    pub fn from_url(url: Option<&str>) -> Self {
        match url.map(str::trim) {
            Some(url) if !url.is_empty() => LockBackend::Redis { url: url.to_string() },
            _ => LockBackend::Memory,
        }
    }

    /// Whether holdings are visible to other processes.
    pub fn is_shared(&self) -> bool {
        matches!(self, LockBackend::Redis { .. })
    }

    pub async fn connect(&self) -> Result<LockStoreHandle, LockError> {
        match self {
            LockBackend::Memory => Ok(Arc::new(MemoryLockStore::new())),
            #[cfg(feature = "redis")]
            LockBackend::Redis { url } => {
                let store = crate::lock::RedisLockStore::connect(url).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "redis"))]
            LockBackend::Redis { .. } => Err(LockError::Connect {
                store: "redis",
                reason: "built without the `redis` feature".into(),
            }),
        }
    }
}

// Connection URLs may carry credentials; never print them.
impl fmt::Debug for LockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for LockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockBackend::Memory => f.write_str("memory"),
            LockBackend::Redis { .. } => f.write_str("redis"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_url_picks_redis_only_for_non_empty_url() {
        assert_eq!(LockBackend::from_url(None), LockBackend::Memory);
        assert_eq!(LockBackend::from_url(Some("  ")), LockBackend::Memory);
        assert_eq!(
            LockBackend::from_url(Some("redis://127.0.0.1:6379/0")),
            LockBackend::Redis {
                url: "redis://127.0.0.1:6379/0".into()
            }
        );
    }

    #[test]
    fn display_hides_credentials() {
        let backend = LockBackend::from_url(Some("redis://:secret@cache:6379"));
        assert_eq!(backend.to_string(), "redis");
        assert!(!format!("{backend:?}").contains("secret"));
        assert!(backend.is_shared());
    }

    #[tokio::test]
    async fn memory_backend_connects() {
        let store = LockBackend::Memory.connect().await.unwrap();
        assert_eq!(store.name(), "memory");
    }
}
