use std::{net::TcpListener, sync::Arc};

use tracing::info;

use vigil_core::ShutdownCoordinator;
use vigil_model::{ListenAddress, TopologyKind, WorkerBudget};
use vigil_prometheus::PrometheusMetrics;

use crate::{AppRef, PeriodicSetup, ServeContext, ServerError, WorkerCommand, select_topology};

/// Starts the application under the configured process topology.
///
/// Initialization of the application runs exactly once per start, before
/// the listener is handed to the topology.
pub struct ServerSupervisor {
    app: AppRef,
    periodic: PeriodicSetup,
    coordinator: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusMetrics>,
    worker_command: Option<WorkerCommand>,
}

impl ServerSupervisor {
    pub fn new(app: AppRef, periodic: PeriodicSetup, coordinator: Arc<ShutdownCoordinator>) -> Self {
        Self {
            app,
            periodic,
            coordinator,
            metrics: None,
            worker_command: None,
        }
    }

    /// Record cycle metrics and serve them on `/metrics`.
    pub fn with_metrics(mut self, metrics: PrometheusMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Command used to launch prefork workers.
    ///
    /// Defaults to the running binary with a single `worker` argument.
    pub fn with_worker_command(mut self, command: WorkerCommand) -> Self {
        self.worker_command = Some(command);
        self
    }

    /// Bind the listening socket.
    pub fn bind(address: &ListenAddress) -> Result<TcpListener, ServerError> {
        let addr = address.to_socket_addr()?;
        TcpListener::bind(addr).map_err(|source| ServerError::Bind {
            addr: address.to_string(),
            source,
        })
    }

    /// Bind `address` and serve until the process is asked to stop.
    pub async fn start(
        &self,
        address: &ListenAddress,
        topology: TopologyKind,
        budget: &WorkerBudget,
    ) -> Result<(), ServerError> {
        let listener = Self::bind(address)?;
        self.serve(listener, address, topology, budget).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(
        &self,
        listener: TcpListener,
        address: &ListenAddress,
        topology: TopologyKind,
        budget: &WorkerBudget,
    ) -> Result<(), ServerError> {
        budget.validate()?;
        self.periodic.validate()?;

        let topology = select_topology(topology, || match &self.worker_command {
            Some(command) => Ok(command.clone()),
            None => Ok(WorkerCommand::current()?.arg("worker")),
        })?;

        info!(
            app = self.app.name(),
            topology = topology.name(),
            addr = %address,
            "initializing application"
        );
        self.app.initialize().await.map_err(ServerError::Init)?;

        let ctx = ServeContext {
            app: Arc::clone(&self.app),
            listener,
            address: address.clone(),
            budget: budget.clone(),
            periodic: self.periodic.clone(),
            coordinator: Arc::clone(&self.coordinator),
            metrics: self.metrics.clone(),
        };
        topology.serve(ctx).await?;

        info!(app = self.app.name(), "server stopped");
        Ok(())
    }
}
