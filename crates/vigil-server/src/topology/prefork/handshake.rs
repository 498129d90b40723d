use vigil_model::WorkerBudget;

use crate::ServerError;

/// Descriptor number under which workers find the listening socket.
pub const LISTEN_FD: i32 = 3;

pub const ENV_LISTEN_FD: &str = "VIGIL_LISTEN_FD";
pub const ENV_WORKER_ID: &str = "VIGIL_WORKER_ID";
pub const ENV_WORKER_BUDGET: &str = "VIGIL_WORKER_BUDGET";
pub const ENV_WORKER_MAX_REQUESTS: &str = "VIGIL_WORKER_MAX_REQUESTS";

/// What the arbiter tells a worker through its environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerHandshake {
    /// Stable slot number, `1..=workers`; reused when a worker is replaced.
    pub id: u32,
    pub listen_fd: i32,
    pub budget: WorkerBudget,
    /// Jittered request budget; `None` disables recycling.
    pub max_requests: Option<u64>,
}

impl WorkerHandshake {
    pub fn new(id: u32, budget: WorkerBudget, max_requests: Option<u64>) -> Self {
        Self {
            id,
            listen_fd: LISTEN_FD,
            budget,
            max_requests,
        }
    }

    pub fn to_env(&self) -> Result<Vec<(&'static str, String)>, ServerError> {
        let budget = serde_json::to_string(&self.budget)
            .map_err(|e| ServerError::Handshake(format!("cannot encode budget: {e}")))?;

        let mut env = vec![
            (ENV_LISTEN_FD, self.listen_fd.to_string()),
            (ENV_WORKER_ID, self.id.to_string()),
            (ENV_WORKER_BUDGET, budget),
        ];
        if let Some(max) = self.max_requests {
            env.push((ENV_WORKER_MAX_REQUESTS, max.to_string()));
        }
        Ok(env)
    }

    /// Read the handshake of the current process.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            get(key).ok_or_else(|| ServerError::Handshake(format!("{key} is not set")))
        };
        let invalid = |key: &str, e: &dyn std::fmt::Display| {
            ServerError::Handshake(format!("{key} is invalid: {e}"))
        };

        let listen_fd = required(ENV_LISTEN_FD)?
            .parse::<i32>()
            .map_err(|e| invalid(ENV_LISTEN_FD, &e))?;
        let id = required(ENV_WORKER_ID)?
            .parse::<u32>()
            .map_err(|e| invalid(ENV_WORKER_ID, &e))?;
        let budget: WorkerBudget = serde_json::from_str(&required(ENV_WORKER_BUDGET)?)
            .map_err(|e| invalid(ENV_WORKER_BUDGET, &e))?;
        let max_requests = get(ENV_WORKER_MAX_REQUESTS)
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| invalid(ENV_WORKER_MAX_REQUESTS, &e))?;

        budget.validate()?;
        Ok(Self {
            id,
            listen_fd,
            budget,
            max_requests,
        })
    }
}
