use std::time::Duration;

use async_trait::async_trait;
use redis::{Client, Script, aio::ConnectionManager};
use tracing::info;

use crate::lock::{LockError, LockStore};

const STORE_NAME: &str = "redis";

/// Compare-and-delete: only the token that set the key may remove it.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Lock store backed by a Redis (or Redis-compatible) server.
///
/// Acquisition is a single `SET key token NX PX ttl`, release a Lua
/// compare-and-delete, so both are atomic on the server side. The connection
/// manager reconnects transparently; a command issued while the server is
/// unreachable surfaces as [`LockError::Store`].
#[derive(Clone)]
pub struct RedisLockStore {
    conn: ConnectionManager,
    release: Script,
}

impl RedisLockStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, LockError> {
        let client = Client::open(url).map_err(|e| LockError::Connect {
            store: STORE_NAME,
            reason: e.to_string(),
        })?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| LockError::Connect {
                store: STORE_NAME,
                reason: e.to_string(),
            })?;

        info!(store = STORE_NAME, "connected to lock store");
        Ok(Self {
            conn,
            release: Script::new(RELEASE_SCRIPT),
        })
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    fn name(&self) -> &'static str {
        STORE_NAME
    }

    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockError> {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, LockError> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .release
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }
}

impl std::fmt::Debug for RedisLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockStore").finish_non_exhaustive()
    }
}
