cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        use std::fmt;
    } else {
        use core::fmt;
    }
}

use serde::{Deserialize, Serialize};

/// All possible states that a Task Instance can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskInstanceState {
    /// Task vanished from DAG before it ran
    Removed,
    /// Task should run and will be handed to executor soon
    Scheduled,
    /// Executor has enqueued the task
    Queued,
    /// Task is executing
    Running,
    /// Task completed
    Success,
    /// External request to restart (e.g. cleared when running)
    Restarting,
    /// Task errored out
    Failed,
    /// Task failed but has retries left
    UpForRetry,
    /// A waiting `reschedule` sensor
    UpForReschedule,
    /// One or more upstream deps failed
    UpstreamFailed,
    /// Skipped by branching or some other mechanism
    Skipped,
    /// Deferrable operator waiting on a trigger
    Deferred,
}

impl TaskInstanceState {
    /// The name of the state as used by the Airflow API.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskInstanceState::Removed => "removed",
            TaskInstanceState::Scheduled => "scheduled",
            TaskInstanceState::Queued => "queued",
            TaskInstanceState::Running => "running",
            TaskInstanceState::Success => "success",
            TaskInstanceState::Restarting => "restarting",
            TaskInstanceState::Failed => "failed",
            TaskInstanceState::UpForRetry => "up_for_retry",
            TaskInstanceState::UpForReschedule => "up_for_reschedule",
            TaskInstanceState::UpstreamFailed => "upstream_failed",
            TaskInstanceState::Skipped => "skipped",
            TaskInstanceState::Deferred => "deferred",
        }
    }

    /// Returns true if no further transitions happen from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskInstanceState::Success
                | TaskInstanceState::Failed
                | TaskInstanceState::Skipped
                | TaskInstanceState::Removed
        )
    }
}

impl fmt::Display for TaskInstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_like_display() {
        let state = TaskInstanceState::UpForRetry;
        let serialized = serde_json::to_string(&state).unwrap();
        assert_eq!(serialized, format!("\"{state}\""));
    }

    #[test]
    fn test_deferred_is_not_terminal() {
        assert!(!TaskInstanceState::Deferred.is_terminal());
        assert!(TaskInstanceState::Failed.is_terminal());
    }
}
