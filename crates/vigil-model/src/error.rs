use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown topology: {0} (expected: prefork|single)")]
    UnknownTopology(String),

    #[error("invalid listen address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("invalid lock spec: {0}")]
    InvalidLock(String),

    #[error("invalid worker budget: {0}")]
    InvalidBudget(String),

    #[error("invalid task schedule: {0}")]
    InvalidSchedule(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
