cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        use std::time;
    } else {
        extern crate alloc;
        use alloc::string::String;
        use alloc::string::ToString;
        use core::time;
    }
}

use airflow_common::serialization::serde::{JsonSerdeError, JsonValue};

/// An error which fails the task instance.
#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// A call to an external system could not be made or was rejected.
    #[error("Request failed: {0}")]
    Request(String),
    /// The task ran, but its outcome is a failure.
    #[error("{0}")]
    Failed(String),
    #[error("Task cannot be resumed with method: {0}")]
    UnknownResumeMethod(String),
    #[error(transparent)]
    Serde(#[from] JsonSerdeError),
}

/// The outcome of executing an operator which did not fail.
#[derive(Debug)]
pub enum TaskOutcome<I, T> {
    /// The operator finished and produced a value.
    Completed(I),
    /// The operator handed over to a trigger and waits to be resumed.
    Deferred(TaskDeferred<T>),
}

impl<I, T> TaskOutcome<I, T> {
    pub fn is_deferred(&self) -> bool {
        matches!(self, TaskOutcome::Deferred(_))
    }

    pub fn into_deferred(self) -> Option<TaskDeferred<T>> {
        match self {
            TaskOutcome::Deferred(deferred) => Some(deferred),
            TaskOutcome::Completed(_) => None,
        }
    }
}

/// Request to defer a task to a trigger. Once the trigger fires, the task is resumed by calling
/// `method_name` with the trigger event and the optional `kwargs`.
#[derive(Debug)]
pub struct TaskDeferred<T> {
    trigger: T,
    method_name: String,
    kwargs: Option<JsonValue>,
    timeout: Option<time::Duration>,
}

impl<T> TaskDeferred<T> {
    pub fn new(trigger: T, method_name: &str) -> Self {
        TaskDeferred {
            trigger,
            method_name: method_name.to_string(),
            kwargs: None,
            timeout: None,
        }
    }

    pub fn with_kwargs(mut self, kwargs: JsonValue) -> Self {
        self.kwargs = Some(kwargs);
        self
    }

    /// Fail the task if the trigger does not fire within the given time.
    pub fn with_timeout(mut self, timeout: time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn kwargs(&self) -> Option<&JsonValue> {
        self.kwargs.as_ref()
    }

    pub fn timeout(&self) -> Option<time::Duration> {
        self.timeout
    }

    pub fn into_trigger(self) -> T {
        self.trigger
    }
}
