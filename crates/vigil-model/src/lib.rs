mod domain;
pub use domain::{DEFAULT_HOST, DEFAULT_PORT, ListenAddress};

mod error;
pub use error::{ModelError, ModelResult};

mod lock;
pub use lock::LockSpec;

mod budget;
pub use budget::{WorkerBudget, default_worker_count};

mod schedule;
pub use schedule::TaskSchedule;

mod topology;
pub use topology::TopologyKind;
