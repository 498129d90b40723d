use async_trait::async_trait;
use tracing::info;

use crate::{ServeContext, ServerError, Topology, process::ProcessRuntime};

/// Serve from the current process without forking.
///
/// Used for development runs and on hosts without prefork support. The
/// periodic task runs next to the request handlers in the same runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleProcess;

#[async_trait]
impl Topology for SingleProcess {
    fn name(&self) -> &'static str {
        "single"
    }

    fn is_supported(&self) -> bool {
        true
    }

    async fn serve(&self, ctx: ServeContext) -> Result<(), ServerError> {
        info!(addr = %ctx.address, "serving from a single process");
        ProcessRuntime::boot(ctx, None).await?.run().await
    }
}
