use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::lock::{LockError, LockStore};

const STORE_NAME: &str = "memory";

#[derive(Debug)]
struct Holding {
    token: String,
    expires_at: Instant,
}

/// In-process lock store.
///
/// Arbitrates between tasks of one process only: fleets simulated in tests
/// and single-process development runs without a shared store. Expiry uses
/// `tokio::time`, so paused-clock tests can fast-forward through timeouts.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    holdings: Mutex<HashMap<String, Holding>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` has a live (non-expired) holding.
    pub fn is_locked(&self, key: &str) -> bool {
        self.guard()
            .map(|map| map.get(key).is_some_and(|h| h.expires_at > Instant::now()))
            .unwrap_or(false)
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<String, Holding>>, LockError> {
        self.holdings.lock().map_err(|_| LockError::Store {
            store: STORE_NAME,
            reason: "holdings map poisoned".into(),
        })
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    fn name(&self) -> &'static str {
        STORE_NAME
    }

    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockError> {
        let now = Instant::now();
        let mut map = self.guard()?;

        if let Some(current) = map.get(key) {
            if current.expires_at > now {
                return Ok(false);
            }
        }
        map.insert(
            key.to_string(),
            Holding {
                token: token.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, LockError> {
        let now = Instant::now();
        let mut map = self.guard()?;

        match map.get(key) {
            Some(h) if h.token == token => {
                let live = h.expires_at > now;
                map.remove(key);
                Ok(live)
            }
            _ => Ok(false),
        }
    }
}
