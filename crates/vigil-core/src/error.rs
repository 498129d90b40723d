use thiserror::Error;

use vigil_model::ModelError;

use crate::lock::LockError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("invalid model: {0}")]
    Model(#[from] ModelError),

    #[error("failed to register signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}
