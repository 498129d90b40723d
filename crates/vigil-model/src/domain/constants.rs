//! Common model-level constants.
//!
//! Defaults shared by the configuration layer and the model types, so the
//! binary and the library agree on what "unset" means.

/// Host the server binds to when none is configured.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Port the server binds to when none is configured.
pub const DEFAULT_PORT: u16 = 9380;
