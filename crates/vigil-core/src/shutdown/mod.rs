//! Signal-driven, idempotent process shutdown.
//!
//! [`ShutdownCoordinator`] owns the process [`StopFlag`]. OS signals, explicit
//! requests and the fatal path all go through [`ShutdownCoordinator::trigger`],
//! which flips the flag exactly once; later triggers are logged and ignored.
mod flag;
pub use flag::StopFlag;

mod kill;
mod signal;

use std::{
    fmt,
    future::Future,
    sync::{Arc, OnceLock},
    time::Duration,
};

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::CoreError;

/// Why the process is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT (Ctrl-C).
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Programmatic request, e.g. a worker reaching its request budget.
    Requested,
    /// Unrecoverable failure outside the periodic task.
    Fatal,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShutdownReason::Interrupt => "SIGINT",
            ShutdownReason::Terminate => "SIGTERM",
            ShutdownReason::Requested => "shutdown request",
            ShutdownReason::Fatal => "fatal error",
        };
        f.write_str(s)
    }
}

/// Coordinates graceful and forced shutdown of one process.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    stop: StopFlag,
    grace: Duration,
    reason: OnceLock<ShutdownReason>,
}

impl ShutdownCoordinator {
    pub const DEFAULT_GRACE: Duration = Duration::from_secs(1);

    pub fn new(grace: Duration) -> Self {
        Self {
            stop: StopFlag::new(),
            grace,
            reason: OnceLock::new(),
        }
    }

    /// Handle to the flag this coordinator flips.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Reason of the first trigger, if any.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_set()
    }

    /// Start shutting down.
    ///
    /// Returns `true` only for the call that actually flipped the flag.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self.reason.set(reason).is_err() {
            info!(%reason, "shutdown already in progress; ignoring");
            return false;
        }
        match reason {
            ShutdownReason::Fatal => error!(%reason, "unrecoverable failure, shutting down..."),
            _ => info!(%reason, "received {reason}, shutting down..."),
        }
        self.stop.set();
        true
    }

    /// Register SIGINT/SIGTERM (Ctrl-C off Unix) and trigger on each delivery.
    ///
    /// Must be called from within a tokio runtime. The returned listener runs
    /// until the runtime shuts down; every signal after the first only logs.
    pub fn install(self: &Arc<Self>) -> Result<JoinHandle<()>, CoreError> {
        let mut signals = signal::Signals::register().map_err(CoreError::Signal)?;
        let this = Arc::clone(self);

        Ok(tokio::spawn(async move {
            while let Some(reason) = signals.recv().await {
                this.trigger(reason);
            }
        }))
    }

    /// Resolves once shutdown has been triggered.
    pub async fn wait(&self) {
        self.stop.wait().await
    }

    /// Run `fut` for at most the grace period.
    ///
    /// Returns `None` if the grace period ran out first.
    pub async fn drain<F: Future>(&self, fut: F) -> Option<F::Output> {
        match tokio::time::timeout(self.grace, fut).await {
            Ok(out) => Some(out),
            Err(_) => {
                warn!(grace_ms = self.grace.as_millis() as u64, "grace period exceeded");
                None
            }
        }
    }

    /// Fatal path: set the flag, give in-flight work the grace period, then
    /// kill the process without unwinding.
    ///
    /// Blocks the calling thread; call it outside of async contexts.
    pub fn abort(&self, err: &dyn fmt::Debug) -> ! {
        error!(error = ?err, "fatal error");
        // The subscriber may not be installed when startup fails early.
        eprintln!("fatal: {err:?}");

        self.trigger(ShutdownReason::Fatal);
        std::thread::sleep(self.grace);
        kill::kill_self()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GRACE)
    }
}
