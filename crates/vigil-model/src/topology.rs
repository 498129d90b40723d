use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Process topology used to serve requests.
///
/// - `Prefork`: a supervisor binds the socket once and keeps a pool of worker
///   processes sharing it. Unix only.
/// - `Single`: the application is served directly by the current process.
///
/// The supervisor substitutes `Single` when `Prefork` is requested on a
/// platform that cannot support it.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TopologyKind {
    #[default]
    Prefork,
    Single,
}

impl TopologyKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyKind::Prefork => "prefork",
            TopologyKind::Single => "single",
        }
    }
}

impl FromStr for TopologyKind {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefork" | "workers" => Ok(TopologyKind::Prefork),
            "single" | "dev" | "development" => Ok(TopologyKind::Single),
            other => Err(ModelError::UnknownTopology(other.to_string())),
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_prefork() {
        assert_eq!(TopologyKind::default(), TopologyKind::Prefork);
    }

    #[test]
    fn parses_aliases_case_insensitive() {
        assert_eq!("PREFORK".parse::<TopologyKind>().unwrap(), TopologyKind::Prefork);
        assert_eq!("dev".parse::<TopologyKind>().unwrap(), TopologyKind::Single);
        assert_eq!(" Single ".parse::<TopologyKind>().unwrap(), TopologyKind::Single);
    }

    #[test]
    fn rejects_unknown() {
        let err = "gevent".parse::<TopologyKind>().unwrap_err();
        assert!(matches!(err, ModelError::UnknownTopology(ref s) if s == "gevent"));
    }

    #[test]
    fn serde_roundtrip_uses_canonical_names() {
        let json = serde_json::to_string(&TopologyKind::Single).unwrap();
        assert_eq!(json, r#""single""#);
        let back: TopologyKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TopologyKind::Single);
    }
}
