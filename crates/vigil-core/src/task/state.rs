use std::fmt;

/// Observable state of a [`crate::CoordinatedTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Idle,
    AttemptingLock,
    Working,
    Waiting,
    Stopped,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Idle => "idle",
            TaskState::AttemptingLock => "attempting-lock",
            TaskState::Working => "working",
            TaskState::Waiting => "waiting",
            TaskState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Counters returned when the periodic task stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskReport {
    /// Units of work started (lock acquired).
    pub cycles: u64,
    /// Units of work that failed or panicked.
    pub failures: u64,
    /// Acquire attempts lost to another holder.
    pub contended: u64,
    /// Acquire attempts that failed inside the lock store.
    pub store_errors: u64,
}
