use std::io;

use crate::shutdown::ShutdownReason;

/// Registered interrupt and termination listeners.
///
/// Registration happens eagerly so a signal that arrives between
/// `register()` and the first `recv()` is not lost.
pub(crate) struct Signals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Signals {
    /// Must be called from within a tokio runtime.
    #[cfg(unix)]
    pub(crate) fn register() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub(crate) fn register() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next signal.
    ///
    /// Returns `None` once the runtime stops delivering signals.
    #[cfg(unix)]
    pub(crate) async fn recv(&mut self) -> Option<ShutdownReason> {
        tokio::select! {
            s = self.interrupt.recv() => s.map(|_| ShutdownReason::Interrupt),
            s = self.terminate.recv() => s.map(|_| ShutdownReason::Terminate),
        }
    }

    #[cfg(not(unix))]
    pub(crate) async fn recv(&mut self) -> Option<ShutdownReason> {
        tokio::signal::ctrl_c()
            .await
            .ok()
            .map(|_| ShutdownReason::Interrupt)
    }
}
