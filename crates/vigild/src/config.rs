use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use vigil_core::{LockBackend, ShutdownCoordinator};
use vigil_model::{
    DEFAULT_HOST, DEFAULT_PORT, ListenAddress, LockSpec, ModelResult, TaskSchedule, TopologyKind,
    WorkerBudget, default_worker_count,
};
use vigil_observe::LoggerConfig;

use crate::cli::Cli;

/// Prefix of environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "VIGIL_";

/// Worker handshake variables share the prefix but are not configuration.
const HANDSHAKE_KEYS: &[&str] = &["LISTEN_FD", "WORKER_ID", "WORKER_BUDGET", "WORKER_MAX_REQUESTS"];

/// Process configuration.
///
/// Sources, later wins: built-in defaults, the TOML file, `VIGIL_*`
/// environment variables, command-line flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub debug: bool,
    pub server: ServerConfig,
    pub lock: LockConfig,
    pub task: TaskConfig,
    pub shutdown: ShutdownConfig,
    pub log: LoggerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub topology: TopologyKind,
    pub workers: usize,
    pub max_requests: u64,
    pub max_requests_jitter: u64,
    pub timeout_secs: u64,
    pub worker_connections: usize,
    pub graceful_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            topology: TopologyKind::default(),
            workers: default_worker_count(),
            max_requests: WorkerBudget::DEFAULT_MAX_REQUESTS,
            max_requests_jitter: WorkerBudget::DEFAULT_JITTER,
            timeout_secs: WorkerBudget::DEFAULT_TIMEOUT_MS / 1_000,
            worker_connections: WorkerBudget::DEFAULT_WORKER_CONNECTIONS,
            graceful_timeout_secs: WorkerBudget::DEFAULT_GRACEFUL_TIMEOUT_MS / 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub name: String,
    pub timeout_secs: u64,
    /// Shared lock store; unset means a process-local store.
    pub redis_url: Option<String>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            name: "update_progress".to_string(),
            timeout_secs: LockSpec::DEFAULT_TIMEOUT_MS / 1_000,
            redis_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub interval_secs: u64,
    pub contention_backoff_ms: u64,
    pub hold_through_wait: bool,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            interval_secs: TaskSchedule::DEFAULT_INTERVAL_MS / 1_000,
            contention_backoff_ms: 0,
            hold_through_wait: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    pub grace_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_ms: ShutdownCoordinator::DEFAULT_GRACE.as_millis() as u64,
        }
    }
}

impl VigilConfig {
    /// Layer the TOML file at `path` (optional) and `VIGIL_*` variables over
    /// the defaults.
    pub fn load(path: &Path) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(VigilConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(HANDSHAKE_KEYS).split("__"))
    }

    /// Apply command-line overrides.
    ///
    /// `--debug` raises the log level and, like `--dev`, selects the
    /// single-process topology.
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        self.debug |= cli.debug;
        if self.debug || cli.dev {
            self.server.topology = TopologyKind::Single;
        }
        self
    }

    pub fn logger(&self) -> LoggerConfig {
        self.log.clone().with_debug(self.debug)
    }

    pub fn address(&self) -> ModelResult<ListenAddress> {
        let address = ListenAddress::new(self.server.host.trim(), self.server.port);
        address.to_socket_addr()?;
        Ok(address)
    }

    pub fn budget(&self) -> ModelResult<WorkerBudget> {
        let s = &self.server;
        let budget = WorkerBudget {
            workers: s.workers,
            max_requests: s.max_requests,
            max_requests_jitter: s.max_requests_jitter,
            timeout_ms: s.timeout_secs.saturating_mul(1_000),
            worker_connections: s.worker_connections,
            graceful_timeout_ms: s.graceful_timeout_secs.saturating_mul(1_000),
        };
        budget.validate()?;
        Ok(budget)
    }

    pub fn lock_spec(&self) -> ModelResult<LockSpec> {
        let spec = LockSpec::new(
            self.lock.name.trim(),
            self.lock.timeout_secs.saturating_mul(1_000),
        );
        spec.validate()?;
        Ok(spec)
    }

    pub fn schedule(&self) -> ModelResult<TaskSchedule> {
        let schedule = TaskSchedule {
            interval_ms: self.task.interval_secs.saturating_mul(1_000),
            contention_backoff_ms: self.task.contention_backoff_ms,
            hold_through_wait: self.task.hold_through_wait,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn lock_backend(&self) -> LockBackend {
        LockBackend::from_url(self.lock.redis_url.as_deref())
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.shutdown.grace_ms)
    }
}
