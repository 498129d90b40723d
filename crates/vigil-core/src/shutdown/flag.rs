use tokio_util::sync::CancellationToken;

/// Process-local stop flag.
///
/// Starts unset, is set at most once and never reset. Clones share the same
/// state, so the signal listener, the periodic task and the server all
/// observe one flip.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(CancellationToken);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Set the flag. Setting an already-set flag does nothing.
    #[inline]
    pub fn set(&self) {
        self.0.cancel();
    }

    /// Resolves once the flag is set; immediately if it already is.
    pub async fn wait(&self) {
        self.0.cancelled().await
    }

    /// Underlying token, for APIs that take a `CancellationToken` directly.
    pub fn token(&self) -> CancellationToken {
        self.0.clone()
    }
}
