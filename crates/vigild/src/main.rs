mod app;
mod cli;
mod config;

use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use vigil_core::ShutdownCoordinator;
use vigil_observe::{init_local_offset, init_logger};
use vigil_prometheus::PrometheusMetrics;
use vigil_server::{
    AppRef, PeriodicSetup, ServerSupervisor, WORKER_BOOT_EXIT_CODE, Worker, WorkerCommand,
};

use crate::{app::ProgressApp, cli::Cli, config::VigilConfig};

const BANNER: &str = r"
        _       _ __
 _   __(_)___ _(_) /
| | / / / __ `/ / /
| |/ / / /_/ / / /
|___/_/\__, /_/_/
      /____/
";

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = VigilConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?
        .with_cli(&cli);

    // Must run before any other thread exists.
    init_local_offset();
    init_logger(&cfg.logger()).context("failed to initialize logger")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let coordinator = Arc::new(ShutdownCoordinator::new(cfg.grace()));

    let result = if cli.is_worker() {
        runtime.block_on(run_worker(&cfg, Arc::clone(&coordinator)))
    } else {
        runtime
            .block_on(run_supervisor(&cli, &cfg, Arc::clone(&coordinator)))
            .map(|()| ExitCode::SUCCESS)
    };

    match result {
        Ok(code) => Ok(code),
        Err(e) => coordinator.abort(&e),
    }
}

async fn run_supervisor(
    cli: &Cli,
    cfg: &VigilConfig,
    coordinator: Arc<ShutdownCoordinator>,
) -> anyhow::Result<()> {
    info!("{BANNER}");
    info!(version = app::VERSION, "vigild starting");

    let address = cfg.address()?;
    let budget = cfg.budget()?;
    let periodic = PeriodicSetup::new(cfg.lock_spec()?, cfg.schedule()?, cfg.lock_backend());
    info!(
        addr = %address,
        topology = %cfg.server.topology,
        workers = budget.workers,
        max_requests = budget.max_requests,
        timeout_ms = budget.timeout_ms,
        lock = %periodic.lock.name,
        lock_store = %periodic.backend,
        interval_ms = periodic.schedule.interval_ms,
        debug = cfg.debug,
        "settings resolved"
    );

    let _signals = coordinator
        .install()
        .context("failed to install signal handlers")?;

    let app = Arc::new(ProgressApp::new());
    let metrics = PrometheusMetrics::new().context("failed to register metrics")?;
    let worker = WorkerCommand::current()
        .context("failed to resolve the current executable")?
        .arg("--config")
        .arg(cli.config.as_os_str())
        .arg("worker");

    ServerSupervisor::new(Arc::clone(&app) as AppRef, periodic, Arc::clone(&coordinator))
        .with_metrics(metrics)
        .with_worker_command(worker)
        .start(&address, cfg.server.topology, &budget)
        .await
        .context("server failed")?;

    info!(
        reason = ?coordinator.reason(),
        progress = app.progress(),
        "vigild stopped"
    );
    Ok(())
}

/// Prefork worker mode. A worker that cannot boot exits with
/// [`WORKER_BOOT_EXIT_CODE`] so the arbiter does not respawn it.
async fn run_worker(
    cfg: &VigilConfig,
    coordinator: Arc<ShutdownCoordinator>,
) -> anyhow::Result<ExitCode> {
    let boot = async {
        let _signals = coordinator.install()?;
        let periodic =
            PeriodicSetup::new(cfg.lock_spec()?, cfg.schedule()?, cfg.lock_backend());
        let metrics = PrometheusMetrics::new()?;
        let app: AppRef = Arc::new(ProgressApp::new());
        let worker = Worker::boot(app, periodic, Arc::clone(&coordinator), Some(metrics)).await?;
        anyhow::Ok(worker)
    };

    let worker = match boot.await {
        Ok(worker) => worker,
        Err(e) => {
            error!(error = ?e, "worker failed to boot");
            return Ok(ExitCode::from(WORKER_BOOT_EXIT_CODE as u8));
        }
    };

    let id = worker.id();
    worker
        .run()
        .await
        .with_context(|| format!("worker {id} failed"))?;
    Ok(ExitCode::SUCCESS)
}
