use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    domain::constants::{DEFAULT_HOST, DEFAULT_PORT},
    error::{ModelError, ModelResult},
};

/// Listening address of the server process.
///
/// Read once at startup and never changed afterwards. Every topology binds
/// exactly this address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenAddress {
    pub host: String,
    pub port: u16,
}

impl ListenAddress {
    /// Create a new address from host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolve into the first matching socket address.
    ///
    /// Hostnames such as `localhost` are resolved through the system resolver.
    pub fn to_socket_addr(&self) -> ModelResult<SocketAddr> {
        let invalid = |reason: String| ModelError::InvalidAddress {
            addr: self.to_string(),
            reason,
        };
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("host resolved to no addresses".to_string()))
    }
}

impl Default for ListenAddress {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ListenAddress {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        let invalid = |reason: &str| ModelError::InvalidAddress {
            addr: s.to_string(),
            reason: reason.to_string(),
        };
        let (host, port) = s.trim().rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port = port.parse::<u16>().map_err(|_| invalid("port is not a number"))?;
        Ok(Self::new(host, port))
    }
}
