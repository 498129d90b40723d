use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::{clock::LoggerTimeZone, format::LoggerFormat, level::LoggerLevel};

/// Logger configuration, usually the `[log]` table of the process config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive (e.g. `"info"`, `"vigil_core=debug,info"`).
    pub level: LoggerLevel,
    pub tz: LoggerTimeZone,
    /// Include the event target (module path) in each line.
    pub with_targets: bool,
    /// Allow ANSI colors; only honored when stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Raises the filter to `debug` when `debug` is set; otherwise unchanged.
    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug {
            self.level = LoggerLevel::debug();
        }
        self
    }

    /// Color needs both the config switch and an interactive stdout.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}
