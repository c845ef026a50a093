use std::time;

use airflow_common::configuration;
use airflow_task_sdk::{
    definitions::{Context, Operator, TaskDeferred, TaskError, TaskOutcome},
    triggers::TriggerEvent,
};
use log::info;

use crate::{
    hooks::{DEFAULT_CONN_ID, EmrApi, EmrClientFactory},
    triggers::EmrTerminateJobFlowTrigger,
};

const DEFAULT_WAITER_DELAY: time::Duration = time::Duration::from_secs(60);
const DEFAULT_WAITER_MAX_ATTEMPTS: u32 = 20;
/// Added to the total waiter time to get the timeout of a deferred task.
const DEFER_TIMEOUT_GRACE: time::Duration = time::Duration::from_secs(60);

pub static EXECUTE_COMPLETE: &str = "execute_complete";

/// Operator to terminate EMR JobFlows.
///
/// Issues exactly one termination request per execution. When `deferrable`, the task then
/// defers to an [EmrTerminateJobFlowTrigger] which waits for the job flow to be terminated.
/// The default of `deferrable` is read from `[operators] default_deferrable`.
#[derive(Debug, Clone)]
pub struct EmrTerminateJobFlowOperator<F: EmrClientFactory> {
    job_flow_id: String,
    aws_conn_id: String,
    deferrable: bool,
    waiter_delay: time::Duration,
    waiter_max_attempts: u32,
    factory: F,
}

impl<F: EmrClientFactory> EmrTerminateJobFlowOperator<F> {
    pub fn new(job_flow_id: &str, factory: F) -> Self {
        EmrTerminateJobFlowOperator {
            job_flow_id: job_flow_id.to_string(),
            aws_conn_id: DEFAULT_CONN_ID.to_string(),
            deferrable: configuration::getboolean("operators", "default_deferrable", false),
            waiter_delay: DEFAULT_WAITER_DELAY,
            waiter_max_attempts: DEFAULT_WAITER_MAX_ATTEMPTS,
            factory,
        }
    }

    pub fn with_aws_conn_id(mut self, aws_conn_id: &str) -> Self {
        self.aws_conn_id = aws_conn_id.to_string();
        self
    }

    pub fn with_deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = deferrable;
        self
    }

    /// Time to wait between two status checks of the trigger.
    pub fn with_waiter_delay(mut self, waiter_delay: time::Duration) -> Self {
        self.waiter_delay = waiter_delay;
        self
    }

    pub fn with_waiter_max_attempts(mut self, waiter_max_attempts: u32) -> Self {
        self.waiter_max_attempts = waiter_max_attempts;
        self
    }

    pub fn job_flow_id(&self) -> &str {
        &self.job_flow_id
    }

    pub fn aws_conn_id(&self) -> &str {
        &self.aws_conn_id
    }

    pub fn deferrable(&self) -> bool {
        self.deferrable
    }

    fn defer_timeout(&self) -> time::Duration {
        self.waiter_delay
            .saturating_mul(self.waiter_max_attempts)
            .saturating_add(DEFER_TIMEOUT_GRACE)
    }
}

impl<F: EmrClientFactory> Operator for EmrTerminateJobFlowOperator<F> {
    type Item = ();
    type Trigger = EmrTerminateJobFlowTrigger<F>;

    async fn execute<'t>(
        &'t mut self,
        _ctx: &'t Context,
    ) -> Result<TaskOutcome<Self::Item, Self::Trigger>, TaskError> {
        if self.job_flow_id.is_empty() {
            return Err(TaskError::InvalidParameter(
                "job_flow_id must not be empty".to_string(),
            ));
        }

        let mut client = self
            .factory
            .create(&self.aws_conn_id)
            .await
            .map_err(|e| TaskError::Request(e.to_string()))?;

        info!("Terminating JobFlow {}", self.job_flow_id);
        let response = client
            .terminate_job_flows(&[self.job_flow_id.as_str()])
            .await
            .map_err(|e| TaskError::Request(e.to_string()))?;

        if !response.response_metadata.is_ok() {
            return Err(TaskError::Failed(format!(
                "JobFlow termination failed: {response}"
            )));
        }
        info!("Termination of JobFlow {} requested", self.job_flow_id);

        if !self.deferrable {
            return Ok(TaskOutcome::Completed(()));
        }

        let trigger = EmrTerminateJobFlowTrigger::new(&self.job_flow_id, self.factory.clone())
            .with_aws_conn_id(&self.aws_conn_id)
            .with_waiter_delay(self.waiter_delay)
            .with_waiter_max_attempts(self.waiter_max_attempts);
        let deferred =
            TaskDeferred::new(trigger, EXECUTE_COMPLETE).with_timeout(self.defer_timeout());
        Ok(TaskOutcome::Deferred(deferred))
    }

    async fn resume<'t>(
        &'t mut self,
        _ctx: &'t Context,
        method_name: &'t str,
        event: TriggerEvent,
    ) -> Result<Self::Item, TaskError> {
        if method_name != EXECUTE_COMPLETE {
            return Err(TaskError::UnknownResumeMethod(method_name.to_string()));
        }
        if !event.is_success() {
            return Err(TaskError::Failed(format!(
                "Error terminating JobFlow: {event}"
            )));
        }
        info!("Jobflow {} terminated successfully.", self.job_flow_id);
        Ok(())
    }
}
