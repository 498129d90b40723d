//! Named, time-boxed mutual exclusion across processes.
//!
//! Exclusivity lives in a shared [`LockStore`]; [`DistributedLock`] only
//! remembers the ownership token of its current holding. Every holding
//! expires after the lock timeout, so a crashed holder delays its competitors
//! by at most that long.
mod backend;
pub use backend::LockBackend;

mod error;
pub use error::LockError;

mod memory;
pub use memory::MemoryLockStore;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::RedisLockStore;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use vigil_model::LockSpec;

/// Shared store that arbitrates lock ownership.
///
/// Implementations must make `try_acquire` atomic: of any number of
/// concurrent callers for the same key, at most one gets `true` until the
/// holding is released or expires.
#[async_trait]
pub trait LockStore: Send + Sync + 'static {
    /// Store name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Takes `key` for `token` with expiry `ttl` unless someone holds it.
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockError>;

    /// Deletes `key` only if it is still held by `token`.
    ///
    /// Returns `false` when the holding already expired or belongs to
    /// someone else; neither case is an error.
    async fn release(&self, key: &str, token: &str) -> Result<bool, LockError>;
}

/// Shared handle to a lock store.
pub type LockStoreHandle = Arc<dyn LockStore>;

/// A named distributed lock bound to one store.
///
/// Each instance carries a unique ownership token, so `release` can never
/// remove a holding taken by another process.
pub struct DistributedLock {
    spec: LockSpec,
    store: LockStoreHandle,
    token: String,
    held: bool,
}

impl DistributedLock {
    /// Create a lock after validating its spec.
    pub fn new(spec: LockSpec, store: LockStoreHandle) -> Result<Self, LockError> {
        spec.validate()?;
        let token = format!("{}:{}", std::process::id(), Uuid::new_v4().simple());
        Ok(Self {
            spec,
            store,
            token,
            held: false,
        })
    }

    pub fn spec(&self) -> &LockSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Whether this instance believes it holds the lock.
    ///
    /// The belief can be stale once the timeout has passed.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Try to take the lock; `Ok(false)` means another process holds it.
    ///
    /// A holding left over from an earlier call is dropped first, so the
    /// returned holding always gets a fresh expiry.
    pub async fn acquire(&mut self) -> Result<bool, LockError> {
        if self.held {
            self.release().await;
        }
        let acquired = self
            .store
            .try_acquire(&self.spec.name, &self.token, self.spec.timeout())
            .await?;

        self.held = acquired;
        trace!(lock = %self.spec.name, acquired, "lock acquire attempt");
        Ok(acquired)
    }

    /// Give the lock up if this instance holds it.
    ///
    /// Never fails: without a holding it is a no-op, and store errors are
    /// logged and left to the expiry. Returns `true` only when a live holding
    /// was actually removed.
    pub async fn release(&mut self) -> bool {
        if !self.held {
            return false;
        }
        self.held = false;

        match self.store.release(&self.spec.name, &self.token).await {
            Ok(true) => {
                trace!(lock = %self.spec.name, "lock released");
                true
            }
            Ok(false) => {
                debug!(lock = %self.spec.name, "lock expired before release");
                false
            }
            Err(e) => {
                warn!(
                    lock = %self.spec.name,
                    store = self.store.name(),
                    error = %e,
                    "lock release failed; holding will expire",
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedLock")
            .field("name", &self.spec.name)
            .field("timeout_ms", &self.spec.timeout_ms)
            .field("store", &self.store.name())
            .field("held", &self.held)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_on(store: &Arc<MemoryLockStore>, timeout_ms: u64) -> DistributedLock {
        let handle: LockStoreHandle = store.clone();
        DistributedLock::new(LockSpec::new("update_progress", timeout_ms), handle).unwrap()
    }

    #[test]
    fn new_rejects_invalid_spec() {
        let store: LockStoreHandle = Arc::new(MemoryLockStore::new());
        let res = DistributedLock::new(LockSpec::new("", 1_000), store);
        assert!(matches!(res, Err(LockError::InvalidSpec(_))));
    }

    #[tokio::test]
    async fn only_one_of_two_competitors_acquires() {
        let store = Arc::new(MemoryLockStore::new());
        let mut a = lock_on(&store, 60_000);
        let mut b = lock_on(&store, 60_000);

        assert!(a.acquire().await.unwrap());
        assert!(!b.acquire().await.unwrap());
        assert!(a.is_held());
        assert!(!b.is_held());

        assert!(a.release().await);
        assert!(b.acquire().await.unwrap());
    }

    #[tokio::test]
    async fn release_without_acquire_is_noop_and_keeps_other_holder() {
        let store = Arc::new(MemoryLockStore::new());
        let mut holder = lock_on(&store, 60_000);
        let mut bystander = lock_on(&store, 60_000);

        assert!(holder.acquire().await.unwrap());
        assert!(!bystander.release().await);
        assert!(!bystander.acquire().await.unwrap());
        assert!(!bystander.release().await);

        assert!(store.is_locked("update_progress"));
        assert!(holder.release().await);
        assert!(!store.is_locked("update_progress"));
    }

    #[tokio::test]
    async fn double_release_is_harmless() {
        let store = Arc::new(MemoryLockStore::new());
        let mut lock = lock_on(&store, 60_000);

        assert!(lock.acquire().await.unwrap());
        assert!(lock.release().await);
        assert!(!lock.release().await);
    }

    #[tokio::test]
    async fn reacquire_by_holder_refreshes_holding() {
        let store = Arc::new(MemoryLockStore::new());
        let mut lock = lock_on(&store, 60_000);

        assert!(lock.acquire().await.unwrap());
        assert!(lock.acquire().await.unwrap());
        assert!(lock.is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_holder_cannot_release_reclaimed_lock() {
        let store = Arc::new(MemoryLockStore::new());
        let mut stale = lock_on(&store, 1_000);
        let mut fresh = lock_on(&store, 1_000);

        assert!(stale.acquire().await.unwrap());
        tokio::time::advance(Duration::from_millis(1_001)).await;
        assert!(fresh.acquire().await.unwrap());

        assert!(!stale.release().await);
        assert!(store.is_locked("update_progress"));
        assert!(fresh.release().await);
    }
}
