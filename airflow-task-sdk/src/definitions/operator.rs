use core::fmt;

use airflow_common::serialization::serde::JsonSerialize;

use crate::definitions::{Context, TaskError, TaskOutcome};
use crate::triggers::{LocalTrigger, TriggerEvent};

/// An operator describes the work of a single task.
///
/// Executing an operator either completes with a value or defers to a trigger. A deferred
/// operator is resumed with the event of its trigger.
///
/// # Example
/// ```
/// use airflow_task_sdk::prelude::*;
///
/// #[derive(Debug, Clone, Default)]
/// struct MyOperator;
///
/// #[derive(Debug)]
/// struct NoTrigger;
///
/// impl Trigger for NoTrigger {
///     fn classpath(&self) -> &'static str {
///         "my.NoTrigger"
///     }
///
///     fn kwargs(&self) -> Result<serde_json::Value, airflow_common::serialization::serde::JsonSerdeError> {
///         Ok(serde_json::Value::Null)
///     }
///
///     fn poll_interval(&self) -> std::time::Duration {
///         std::time::Duration::from_secs(1)
///     }
///
///     async fn poll(&mut self) -> TriggerPoll {
///         TriggerPoll::Ready(TriggerEvent::success())
///     }
///
///     fn cleanup(&mut self) {}
/// }
///
/// impl Operator for MyOperator {
///     type Item = ();
///     type Trigger = NoTrigger;
///
///     async fn execute<'t>(
///         &'t mut self,
///         ctx: &'t Context,
///     ) -> Result<TaskOutcome<Self::Item, Self::Trigger>, TaskError> {
///         Ok(TaskOutcome::Completed(()))
///     }
///
///     async fn resume<'t>(
///         &'t mut self,
///         ctx: &'t Context,
///         method_name: &'t str,
///         event: TriggerEvent,
///     ) -> Result<Self::Item, TaskError> {
///         Err(TaskError::UnknownResumeMethod(method_name.to_string()))
///     }
/// }
/// ```
#[trait_variant::make(Operator: Send)]
pub trait LocalOperator: Clone + fmt::Debug + 'static {
    /// The value produced by a completed execution.
    type Item: JsonSerialize;
    /// The trigger this operator defers to.
    type Trigger: LocalTrigger;

    async fn execute<'t>(
        &'t mut self,
        ctx: &'t Context,
    ) -> Result<TaskOutcome<Self::Item, Self::Trigger>, TaskError>;

    /// Resume a deferred execution once its trigger fired.
    /// `method_name` is the one given in [crate::definitions::TaskDeferred].
    async fn resume<'t>(
        &'t mut self,
        ctx: &'t Context,
        method_name: &'t str,
        event: TriggerEvent,
    ) -> Result<Self::Item, TaskError>;
}
