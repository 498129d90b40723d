use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use vigil_core::WorkRef;

/// Error type of application hooks.
pub type AppError = Box<dyn std::error::Error + Send + Sync>;

/// The hosted application, opaque to the supervisor.
///
/// `initialize` runs once per supervisor start, before any process serves.
/// Under prefork it runs in the arbiter only; workers build `router` and
/// `work_unit` on their own.
#[async_trait]
pub trait Application: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// One-time setup (schema checks, factory registration, ...).
    async fn initialize(&self) -> Result<(), AppError> {
        Ok(())
    }

    /// Routes served by every serving process.
    fn router(&self) -> Router;

    /// Unit of work run under the distributed lock.
    fn work_unit(&self) -> WorkRef;
}

/// Shared handle to the application.
pub type AppRef = Arc<dyn Application>;
