use tracing::warn;

use vigil_core::{
    CoordinatedTask, DistributedLock, LockBackend, MetricsHandle, StopFlag, WorkRef,
};
use vigil_model::{LockSpec, ModelResult, TaskSchedule};

use crate::ServerError;

/// Everything a serving process needs to run its copy of the periodic task.
#[derive(Clone, Debug)]
pub struct PeriodicSetup {
    pub lock: LockSpec,
    pub schedule: TaskSchedule,
    pub backend: LockBackend,
}

impl PeriodicSetup {
    pub fn new(lock: LockSpec, schedule: TaskSchedule, backend: LockBackend) -> Self {
        Self {
            lock,
            schedule,
            backend,
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        self.lock.validate()?;
        self.schedule.validate()
    }

    /// Connect the lock store and build the task without starting it.
    pub(crate) async fn prepare(
        &self,
        work: WorkRef,
        stop: StopFlag,
        metrics: Option<MetricsHandle>,
    ) -> Result<CoordinatedTask, ServerError> {
        if !self.backend.is_shared() {
            warn!(
                lock = %self.lock.name,
                backend = %self.backend,
                "lock store is process-local; periodic work is not coordinated across processes"
            );
        }
        let store = self.backend.connect().await?;
        let lock = DistributedLock::new(self.lock.clone(), store)?;

        let task = CoordinatedTask::new(lock, work, self.schedule.clone(), stop)?;
        Ok(match metrics {
            Some(metrics) => task.with_metrics(metrics),
            None => task,
        })
    }
}
