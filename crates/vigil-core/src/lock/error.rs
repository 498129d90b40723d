use thiserror::Error;

use vigil_model::ModelError;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("invalid lock spec: {0}")]
    InvalidSpec(#[from] ModelError),

    #[error("cannot connect to lock store '{store}': {reason}")]
    Connect { store: &'static str, reason: String },

    #[error("lock store '{store}' failed: {reason}")]
    Store { store: &'static str, reason: String },
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for LockError {
    fn from(e: redis::RedisError) -> Self {
        LockError::Store {
            store: "redis",
            reason: e.to_string(),
        }
    }
}
