use std::{collections::HashMap, io, os::fd::AsRawFd, process::ExitStatus};

use rand::Rng;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{
    ServeContext, ServerError,
    topology::prefork::{WORKER_BOOT_EXIT_CODE, WorkerCommand, WorkerHandshake, handoff},
};

struct WorkerExit {
    id: u32,
    status: io::Result<ExitStatus>,
}

/// How a worker process ended, as seen by the arbiter.
#[derive(Debug, PartialEq, Eq)]
enum ExitKind {
    /// Clean exit: request budget reached or told to stop.
    Recycled,
    /// The worker never got to serve.
    BootFailed,
    /// Anything else; the description goes to the log.
    Crashed(String),
}

fn classify(status: &io::Result<ExitStatus>) -> ExitKind {
    use std::os::unix::process::ExitStatusExt;

    match status {
        Ok(s) if s.success() => ExitKind::Recycled,
        Ok(s) if s.code() == Some(WORKER_BOOT_EXIT_CODE) => ExitKind::BootFailed,
        Ok(s) => match (s.code(), s.signal()) {
            (Some(code), _) => ExitKind::Crashed(format!("exit code {code}")),
            (None, Some(sig)) => ExitKind::Crashed(format!("killed by signal {sig}")),
            (None, None) => ExitKind::Crashed(s.to_string()),
        },
        Err(e) => ExitKind::Crashed(format!("wait failed: {e}")),
    }
}

/// Parent of the prefork pool.
///
/// Keeps `budget.workers` workers alive until shutdown, then sends each a
/// SIGTERM and kills whatever is left after `graceful_timeout`.
pub(super) struct Arbiter {
    command: WorkerCommand,
    ctx: ServeContext,
    pids: HashMap<u32, u32>,
    workers: JoinSet<WorkerExit>,
}

impl Arbiter {
    pub(super) fn new(command: WorkerCommand, ctx: ServeContext) -> Self {
        Self {
            command,
            ctx,
            pids: HashMap::new(),
            workers: JoinSet::new(),
        }
    }

    pub(super) async fn run(mut self) -> Result<(), ServerError> {
        let workers = self.ctx.budget.workers;
        info!(
            role = "arbiter",
            pid = std::process::id(),
            addr = %self.ctx.address,
            workers,
            "prefork arbiter started"
        );

        let mut result = Ok(());
        for id in 1..=workers as u32 {
            if let Err(e) = self.spawn(id) {
                result = Err(e);
                break;
            }
        }

        if result.is_ok() {
            result = self.supervise().await;
        }
        if result.is_err() {
            self.ctx.coordinator.stop_flag().set();
        }

        self.stop_workers().await;
        result
    }

    async fn supervise(&mut self) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                _ = self.ctx.coordinator.wait() => return Ok(()),
                Some(joined) = self.workers.join_next() => {
                    let exit = match joined {
                        Ok(exit) => exit,
                        Err(e) => {
                            error!(role = "arbiter", error = %e, "worker monitor failed");
                            continue;
                        }
                    };
                    self.pids.remove(&exit.id);

                    if self.ctx.coordinator.is_stopping() {
                        return Ok(());
                    }
                    match classify(&exit.status) {
                        ExitKind::Recycled => {
                            info!(role = "arbiter", worker = exit.id, "worker recycled");
                        }
                        ExitKind::BootFailed => {
                            error!(role = "arbiter", worker = exit.id, "worker failed to boot; stopping");
                            return Err(ServerError::WorkerBoot { id: exit.id });
                        }
                        ExitKind::Crashed(how) => {
                            warn!(role = "arbiter", worker = exit.id, status = %how, "worker exited unexpectedly; respawning");
                        }
                    }
                    self.spawn(exit.id)?;
                }
            }
        }
    }

    fn spawn(&mut self, id: u32) -> Result<(), ServerError> {
        let budget = &self.ctx.budget;
        let jitter = rand::thread_rng().gen_range(0..=budget.max_requests_jitter);
        let handshake = WorkerHandshake::new(id, budget.clone(), budget.requests_for(jitter));

        let mut cmd = self.command.to_command();
        cmd.envs(handshake.to_env()?)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);
        handoff::inherit_listener(&mut cmd, self.ctx.listener.as_raw_fd());

        let mut child = cmd
            .spawn()
            .map_err(|source| ServerError::Spawn { id, source })?;
        let pid = child.id();
        if let Some(pid) = pid {
            self.pids.insert(id, pid);
        }
        info!(
            role = "arbiter",
            worker = id,
            pid,
            max_requests = ?handshake.max_requests,
            "worker spawned"
        );

        self.workers.spawn(async move {
            let status = child.wait().await;
            WorkerExit { id, status }
        });
        Ok(())
    }

    async fn stop_workers(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for (&id, &pid) in &self.pids {
            debug!(role = "arbiter", worker = id, pid, "sending SIGTERM");
            if let Err(e) = handoff::signal_worker(pid, libc::SIGTERM) {
                warn!(role = "arbiter", worker = id, pid, error = %e, "failed to signal worker");
            }
        }

        let graceful = self.ctx.budget.graceful_timeout();
        let workers = &mut self.workers;
        let drained = tokio::time::timeout(graceful, async {
            while let Some(joined) = workers.join_next().await {
                if let Ok(exit) = joined {
                    debug!(role = "arbiter", worker = exit.id, "worker stopped");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                role = "arbiter",
                remaining = self.workers.len(),
                graceful_ms = self.ctx.budget.graceful_timeout_ms,
                "workers did not stop in time; killing"
            );
            // Aborting the monitors drops each `Child`, which SIGKILLs it.
            self.workers.shutdown().await;
        }
        self.pids.clear();
        info!(role = "arbiter", "all workers stopped");
    }
}
