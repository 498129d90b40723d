use std::io;

use thiserror::Error;

use vigil_core::{CoreError, LockError};
use vigil_model::ModelError;

use crate::app::AppError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Model(#[from] ModelError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("lock store unavailable: {0}")]
    Lock(#[from] LockError),

    #[error("application initialization failed: {0}")]
    Init(#[source] AppError),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to spawn worker {id}: {source}")]
    Spawn {
        id: u32,
        #[source]
        source: io::Error,
    },

    #[error("worker {id} failed to boot")]
    WorkerBoot { id: u32 },

    #[error("invalid worker handshake: {0}")]
    Handshake(String),

    #[error("http server stopped unexpectedly")]
    Stopped,

    #[error("topology '{0}' is not supported on this platform")]
    Unsupported(&'static str),
}
