mod coordinated;
pub use coordinated::CoordinatedTask;

mod state;
pub use state::{TaskReport, TaskState};

mod work;
pub use work::{WorkError, WorkFn, WorkRef, WorkUnit};
