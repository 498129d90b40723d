//! Prefork topology: one arbiter process owning the listening socket and a
//! pool of re-executed worker processes sharing it.
//!
//! The arbiter starts `workers` copies of [`WorkerCommand`] with the socket
//! inherited as descriptor 3 and a [`WorkerHandshake`] in the environment.
//! Each worker serves requests and runs its own periodic task until it hits
//! its request budget or is told to stop. Exited workers are replaced until
//! shutdown.
#[cfg(unix)]
mod arbiter;
#[cfg(unix)]
mod handoff;

mod handshake;
pub use handshake::{
    ENV_LISTEN_FD, ENV_WORKER_BUDGET, ENV_WORKER_ID, ENV_WORKER_MAX_REQUESTS, LISTEN_FD,
    WorkerHandshake,
};

mod worker;
pub use worker::Worker;

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

use crate::{ServeContext, ServerError, Topology};

/// Exit code of a worker that could not start serving.
///
/// The arbiter stops instead of respawning, since a replacement would fail
/// the same way.
pub const WORKER_BOOT_EXIT_CODE: i32 = 3;

/// How the arbiter launches a worker process.
#[derive(Clone, Debug)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Re-execute the running binary.
    pub fn current() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Extra environment for workers, on top of the inherited one.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    #[cfg_attr(not(unix), allow(dead_code))]
    pub(crate) fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.envs.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

/// Multi-process topology (Unix only).
#[derive(Clone, Debug)]
pub struct Prefork {
    command: WorkerCommand,
}

impl Prefork {
    pub fn new(command: WorkerCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Topology for Prefork {
    fn name(&self) -> &'static str {
        "prefork"
    }

    fn is_supported(&self) -> bool {
        cfg!(unix)
    }

    #[cfg(unix)]
    async fn serve(&self, ctx: ServeContext) -> Result<(), ServerError> {
        arbiter::Arbiter::new(self.command.clone(), ctx).run().await
    }

    #[cfg(not(unix))]
    async fn serve(&self, _ctx: ServeContext) -> Result<(), ServerError> {
        Err(ServerError::Unsupported(self.name()))
    }
}
