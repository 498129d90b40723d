//! Logging setup shared by every vigil process.
//!
//! The supervisor and each worker call [`init_logger`] exactly once, before
//! any other component starts emitting `tracing` events.
mod clock;
mod config;
mod error;
mod format;
mod install;
mod level;

pub use clock::{LoggerClock, LoggerTimeZone, init_local_offset};
pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;

/// Installs the global tracing subscriber described by `cfg`.
///
/// Returns [`LoggerError::AlreadyInitialized`] when a subscriber is already
/// installed, which lets tests call it repeatedly.
///
/// # Examples
/// ```rust
/// use vigil_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::default();
/// let _ = init_logger(&config);
/// tracing::info!("logger ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => install::text(cfg),
        LoggerFormat::Json => install::json(cfg),
        LoggerFormat::Journald => install::journald(cfg),
    }
}
