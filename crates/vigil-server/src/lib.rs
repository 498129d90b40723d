mod app;
pub use app::{AppError, AppRef, Application};

mod error;
pub use error::ServerError;

mod periodic;
pub use periodic::PeriodicSetup;

mod process;
mod router;

mod supervisor;
pub use supervisor::ServerSupervisor;

pub mod topology;
pub use topology::prefork::{WORKER_BOOT_EXIT_CODE, Worker, WorkerHandshake};
pub use topology::{Prefork, ServeContext, SingleProcess, Topology, WorkerCommand, select_topology};
