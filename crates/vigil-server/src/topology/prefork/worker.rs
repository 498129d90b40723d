use std::{net::TcpListener, sync::Arc};

use tracing::info;

use vigil_core::ShutdownCoordinator;
use vigil_model::ListenAddress;
use vigil_prometheus::PrometheusMetrics;

use crate::{
    AppRef, PeriodicSetup, ServeContext, ServerError, process::ProcessRuntime,
    topology::prefork::WorkerHandshake,
};

/// A prefork worker process, booted from the arbiter's handshake.
///
/// Application initialization already ran in the arbiter and is not repeated.
pub struct Worker {
    handshake: WorkerHandshake,
    runtime: ProcessRuntime,
}

impl Worker {
    /// Adopt the inherited socket, connect the lock store and build the
    /// serving stack. Failing here means the worker never served.
    pub async fn boot(
        app: AppRef,
        periodic: PeriodicSetup,
        coordinator: Arc<ShutdownCoordinator>,
        metrics: Option<PrometheusMetrics>,
    ) -> Result<Self, ServerError> {
        let handshake = WorkerHandshake::from_env()?;
        let listener = adopt(handshake.listen_fd)?;
        let local = listener.local_addr()?;

        let ctx = ServeContext {
            app,
            listener,
            address: ListenAddress::new(local.ip().to_string(), local.port()),
            budget: handshake.budget.clone(),
            periodic,
            coordinator,
            metrics,
        };
        let runtime = ProcessRuntime::boot(ctx, handshake.max_requests).await?;

        info!(
            worker = handshake.id,
            pid = std::process::id(),
            max_requests = ?handshake.max_requests,
            "worker booted"
        );
        Ok(Self { handshake, runtime })
    }

    pub fn id(&self) -> u32 {
        self.handshake.id
    }

    /// Serve until the request budget is spent or a stop signal arrives.
    pub async fn run(self) -> Result<(), ServerError> {
        let id = self.handshake.id;
        self.runtime.run().await?;
        info!(worker = id, "worker exiting");
        Ok(())
    }
}

#[cfg(unix)]
fn adopt(fd: i32) -> Result<TcpListener, ServerError> {
    Ok(super::handoff::adopt_listener(fd)?)
}

#[cfg(not(unix))]
fn adopt(_fd: i32) -> Result<TcpListener, ServerError> {
    Err(ServerError::Unsupported("prefork"))
}
