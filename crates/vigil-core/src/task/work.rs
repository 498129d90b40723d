use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

/// Failure of one unit of work.
///
/// Never stops the periodic task; it is logged and counted.
#[derive(Debug, Error)]
pub enum WorkError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Source(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl WorkError {
    pub fn failed(reason: impl Into<String>) -> Self {
        WorkError::Failed(reason.into())
    }
}

/// Operation executed while the distributed lock is held.
///
/// The lock guarantees that at most one process of the fleet runs it at any
/// instant, so implementations may assume exclusive access to whatever the
/// lock guards.
#[async_trait]
pub trait WorkUnit: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn run(&self) -> Result<(), WorkError>;
}

/// Shared handle to a work unit.
pub type WorkRef = Arc<dyn WorkUnit>;

/// [`WorkUnit`] built from an async closure.
pub struct WorkFn<F> {
    name: String,
    f: F,
}

impl<F, Fut> WorkFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Shortcut for `Arc::new(WorkFn::new(..))`.
    pub fn arc(name: impl Into<String>, f: F) -> WorkRef {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> WorkUnit for WorkFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), WorkError> {
        (self.f)().await
    }
}
