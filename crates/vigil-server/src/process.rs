use std::{future::IntoFuture, io, net::SocketAddr, sync::Arc};

use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

use vigil_core::{CoordinatedTask, MetricsHandle, ShutdownCoordinator, ShutdownReason, TaskReport};

use crate::{
    AppRef, ServeContext, ServerError,
    router::{RequestBudget, serving_stack},
};

/// A serving process that finished booting: listener adopted, lock store
/// connected, router assembled. Used by the single-process topology and by
/// every prefork worker.
pub(crate) struct ProcessRuntime {
    app: AppRef,
    coordinator: Arc<ShutdownCoordinator>,
    listener: tokio::net::TcpListener,
    local: SocketAddr,
    task: CoordinatedTask,
    router: axum::Router,
}

impl ProcessRuntime {
    /// `max_requests` enables recycling after that many requests.
    pub(crate) async fn boot(
        ctx: ServeContext,
        max_requests: Option<u64>,
    ) -> Result<Self, ServerError> {
        let ServeContext {
            app,
            listener,
            budget,
            periodic,
            coordinator,
            metrics,
            ..
        } = ctx;

        listener.set_nonblocking(true)?;
        let listener = tokio::net::TcpListener::from_std(listener)?;
        let local = listener.local_addr()?;

        let handle = metrics.clone().map(|m| Arc::new(m) as MetricsHandle);
        let task = periodic
            .prepare(app.work_unit(), coordinator.stop_flag(), handle)
            .await?;

        let recycle = max_requests
            .map(|limit| Arc::new(RequestBudget::new(limit, Arc::clone(&coordinator))));
        let router = serving_stack(app.router(), &budget, recycle, metrics);

        Ok(Self {
            app,
            coordinator,
            listener,
            local,
            task,
            router,
        })
    }

    /// Serve until the coordinator stops the process, then drain.
    pub(crate) async fn run(self) -> Result<(), ServerError> {
        let Self {
            app,
            coordinator,
            listener,
            local,
            task,
            router,
        } = self;

        let task = task.spawn();
        let stop = coordinator.stop_flag();
        let mut server: JoinHandle<io::Result<()>> = tokio::spawn(
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop.wait().await })
                .into_future(),
        );
        info!(app = app.name(), addr = %local, pid = std::process::id(), "listening");

        let finished = tokio::select! {
            biased;
            _ = coordinator.wait() => None,
            joined = &mut server => Some(joined),
        };

        let Some(joined) = finished else {
            drain(&coordinator, server, task).await;
            return Ok(());
        };

        // Graceful shutdown can complete the server before the wait arm is
        // polled; only an exit nobody asked for is a failure.
        let failure = match joined {
            Ok(Ok(())) if coordinator.is_stopping() => None,
            Ok(Ok(())) => Some(ServerError::Stopped),
            Ok(Err(e)) => Some(ServerError::Io(e)),
            Err(e) => Some(ServerError::Io(io::Error::other(e))),
        };
        if failure.is_some() {
            coordinator.trigger(ShutdownReason::Fatal);
        }
        report_task(coordinator.drain(task).await);

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Give open connections and the periodic task the grace period, then drop
/// whatever is left.
async fn drain(
    coordinator: &ShutdownCoordinator,
    mut server: JoinHandle<io::Result<()>>,
    task: JoinHandle<TaskReport>,
) {
    let drained = coordinator
        .drain(async { tokio::join!(&mut server, task) })
        .await;

    match drained {
        Some((_, task)) => report_task(Some(task)),
        None => {
            warn!("grace period elapsed; dropping open connections");
            server.abort();
        }
    }
}

/// Log how the periodic task ended; `None` means it outlived the grace period.
fn report_task(joined: Option<Result<TaskReport, JoinError>>) {
    match joined {
        Some(Ok(report)) => info!(
            cycles = report.cycles,
            failures = report.failures,
            contended = report.contended,
            "process drained"
        ),
        Some(Err(e)) => warn!(error = %e, "periodic task ended abnormally"),
        None => warn!("periodic task did not stop within the grace period"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn report_task_accepts_every_ending() {
        report_task(Some(Ok(TaskReport::default())));
        report_task(None);

        let aborted = tokio::spawn(std::future::pending::<TaskReport>());
        aborted.abort();
        let joined = aborted.await;
        assert!(joined.as_ref().is_err_and(|e| e.is_cancelled()));
        report_task(Some(joined));
    }
}
