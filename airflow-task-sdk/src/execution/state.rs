cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        use std::fmt;
    } else {
        use core::fmt;
    }
}

use airflow_common::utils::TaskInstanceState;

/// Possible states of a task instance as a result of task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionTIState {
    /// Task completed
    Success,
    /// Task errored out
    Failed,
    /// Deferrable operator waiting on a trigger
    Deferred,
}

impl From<ExecutionTIState> for TaskInstanceState {
    fn from(state: ExecutionTIState) -> Self {
        match state {
            ExecutionTIState::Success => TaskInstanceState::Success,
            ExecutionTIState::Failed => TaskInstanceState::Failed,
            ExecutionTIState::Deferred => TaskInstanceState::Deferred,
        }
    }
}

impl fmt::Display for ExecutionTIState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        TaskInstanceState::from(*self).fmt(f)
    }
}
