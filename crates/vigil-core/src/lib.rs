pub mod error;
pub mod lock;
pub mod metrics;
pub mod shutdown;
pub mod task;

pub use error::CoreError;
pub use lock::{DistributedLock, LockBackend, LockError, LockStore, LockStoreHandle, MemoryLockStore};
#[cfg(feature = "redis")]
pub use lock::RedisLockStore;
pub use metrics::{CycleOutcome, MetricsBackend, MetricsHandle, NoOpMetrics, noop_metrics};
pub use shutdown::{ShutdownCoordinator, ShutdownReason, StopFlag};
pub use task::{CoordinatedTask, TaskReport, TaskState, WorkError, WorkFn, WorkRef, WorkUnit};

pub mod prelude {
    pub use crate::error::CoreError;
    pub use crate::lock::{DistributedLock, LockBackend, LockStore, MemoryLockStore};
    pub use crate::shutdown::{ShutdownCoordinator, StopFlag};
    pub use crate::task::{CoordinatedTask, WorkError, WorkFn, WorkUnit};
}
