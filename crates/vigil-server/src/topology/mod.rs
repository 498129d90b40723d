//! Process topologies the supervisor can run.
//!
//! A [`Topology`] receives a bound listener and serves on it until the
//! coordinator stops the process. [`select_topology`] maps the configured
//! [`TopologyKind`] to an implementation the host supports.
mod single;
pub use single::SingleProcess;

pub mod prefork;
pub use prefork::{Prefork, WorkerCommand};

use std::{io, net::TcpListener, sync::Arc};

use async_trait::async_trait;
use tracing::warn;

use vigil_core::ShutdownCoordinator;
use vigil_model::{ListenAddress, TopologyKind, WorkerBudget};
use vigil_prometheus::PrometheusMetrics;

use crate::{AppRef, PeriodicSetup, ServerError};

/// Everything a topology needs to serve.
pub struct ServeContext {
    pub app: AppRef,
    /// Listener bound once by the supervisor.
    pub listener: TcpListener,
    pub address: ListenAddress,
    pub budget: WorkerBudget,
    pub periodic: PeriodicSetup,
    pub coordinator: Arc<ShutdownCoordinator>,
    pub metrics: Option<PrometheusMetrics>,
}

#[async_trait]
pub trait Topology: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the host platform can run this topology.
    fn is_supported(&self) -> bool;

    /// Serve until the coordinator stops the process.
    async fn serve(&self, ctx: ServeContext) -> Result<(), ServerError>;
}

/// Pick the topology for `kind`, substituting the single-process variant
/// when the requested one is unavailable on this host.
///
/// `worker_command` is only consulted when prefork is requested.
pub fn select_topology<F>(kind: TopologyKind, worker_command: F) -> Result<Box<dyn Topology>, ServerError>
where
    F: FnOnce() -> io::Result<WorkerCommand>,
{
    let candidate: Box<dyn Topology> = match kind {
        TopologyKind::Single => Box::new(SingleProcess),
        TopologyKind::Prefork => Box::new(Prefork::new(worker_command()?)),
    };
    Ok(supported_or_single(candidate))
}

fn supported_or_single(candidate: Box<dyn Topology>) -> Box<dyn Topology> {
    if candidate.is_supported() {
        return candidate;
    }
    warn!(
        topology = candidate.name(),
        "topology is not supported on this platform; serving from a single process"
    );
    Box::new(SingleProcess)
}
