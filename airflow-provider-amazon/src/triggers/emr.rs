use std::{fmt, time};

use airflow_common::serialization::serde::{JsonSerdeError, JsonValue, deserialize, serialize};
use airflow_task_sdk::triggers::{Trigger, TriggerEvent, TriggerPoll};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::hooks::{
    ClusterState, DEFAULT_CONN_ID, DescribeClusterResponse, EmrApi, EmrClientFactory,
};

pub static EMR_TERMINATE_JOB_FLOW_TRIGGER_CLASSPATH: &str =
    "airflow.providers.amazon.aws.triggers.emr.EmrTerminateJobFlowTrigger";

const DEFAULT_WAITER_DELAY: time::Duration = time::Duration::from_secs(30);
const DEFAULT_WAITER_MAX_ATTEMPTS: u32 = 60;
const DEFAULT_MAX_REQUEST_FAILURES: u32 = 3;

/// Polls an EMR job flow until it is terminated.
///
/// Fires a success event once the cluster reaches `TERMINATED` and an error event on
/// `TERMINATED_WITH_ERRORS`, when `waiter_max_attempts` polls did not see a terminal state, or
/// after `max_request_failures` consecutive failed status checks. A session which cannot be
/// created counts as a failed status check. Every event carries the `job_flow_id`.
///
/// The EMR session is created on the first poll and released when the trigger fires or is
/// cleaned up.
pub struct EmrTerminateJobFlowTrigger<F: EmrClientFactory> {
    job_flow_id: String,
    aws_conn_id: String,
    waiter_delay: time::Duration,
    waiter_max_attempts: u32,
    max_request_failures: u32,
    factory: F,
    attempts: u32,
    request_failures: u32,
    client: Option<F::Client>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TriggerKwargs {
    job_flow_id: String,
    /// seconds
    waiter_delay: u64,
    waiter_max_attempts: u32,
    #[serde(default)]
    aws_conn_id: Option<String>,
}

impl<F: EmrClientFactory> EmrTerminateJobFlowTrigger<F> {
    pub fn new(job_flow_id: &str, factory: F) -> Self {
        EmrTerminateJobFlowTrigger {
            job_flow_id: job_flow_id.to_string(),
            aws_conn_id: DEFAULT_CONN_ID.to_string(),
            waiter_delay: DEFAULT_WAITER_DELAY,
            waiter_max_attempts: DEFAULT_WAITER_MAX_ATTEMPTS,
            max_request_failures: DEFAULT_MAX_REQUEST_FAILURES,
            factory,
            attempts: 0,
            request_failures: 0,
            client: None,
        }
    }

    /// Recreate a trigger from the kwargs it was deferred with.
    pub fn from_kwargs(kwargs: &JsonValue, factory: F) -> Result<Self, JsonSerdeError> {
        let kwargs: TriggerKwargs = deserialize(kwargs)?;
        let trigger = Self::new(&kwargs.job_flow_id, factory)
            .with_waiter_delay(time::Duration::from_secs(kwargs.waiter_delay))
            .with_waiter_max_attempts(kwargs.waiter_max_attempts);
        Ok(match kwargs.aws_conn_id {
            Some(aws_conn_id) => trigger.with_aws_conn_id(&aws_conn_id),
            None => trigger,
        })
    }

    pub fn with_aws_conn_id(mut self, aws_conn_id: &str) -> Self {
        self.aws_conn_id = aws_conn_id.to_string();
        self
    }

    pub fn with_waiter_delay(mut self, waiter_delay: time::Duration) -> Self {
        self.waiter_delay = waiter_delay;
        self
    }

    /// At least one attempt is always made.
    pub fn with_waiter_max_attempts(mut self, waiter_max_attempts: u32) -> Self {
        self.waiter_max_attempts = waiter_max_attempts.max(1);
        self
    }

    /// How many status checks in a row may fail before the trigger gives up.
    pub fn with_max_request_failures(mut self, max_request_failures: u32) -> Self {
        self.max_request_failures = max_request_failures.max(1);
        self
    }

    pub fn job_flow_id(&self) -> &str {
        &self.job_flow_id
    }

    pub fn aws_conn_id(&self) -> &str {
        &self.aws_conn_id
    }

    pub fn waiter_delay(&self) -> time::Duration {
        self.waiter_delay
    }

    pub fn waiter_max_attempts(&self) -> u32 {
        self.waiter_max_attempts
    }

    /// Whether the trigger currently holds an EMR session.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Describe the cluster, creating the EMR session first if there is none.
    async fn describe(&mut self) -> Result<DescribeClusterResponse, String> {
        let mut client = match self.client.take() {
            Some(client) => client,
            None => {
                let client = self
                    .factory
                    .create(&self.aws_conn_id)
                    .await
                    .map_err(|e| format!("Failed to create EMR session: {e}"))?;
                debug!("Created EMR session for {}", self.aws_conn_id);
                client
            }
        };
        let result = client.describe_cluster(&self.job_flow_id).await;
        self.client = Some(client);
        result.map_err(|e| e.to_string())
    }

    fn fire(&mut self, event: TriggerEvent) -> TriggerPoll {
        self.client = None;
        TriggerPoll::Ready(event.with("job_flow_id", self.job_flow_id.as_str()))
    }

    fn fail(&mut self, message: &str) -> TriggerPoll {
        warn!("JobFlow {}: {message}", self.job_flow_id);
        self.fire(TriggerEvent::error(message))
    }
}

impl<F: EmrClientFactory> fmt::Debug for EmrTerminateJobFlowTrigger<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmrTerminateJobFlowTrigger")
            .field("job_flow_id", &self.job_flow_id)
            .field("aws_conn_id", &self.aws_conn_id)
            .field("waiter_delay", &self.waiter_delay)
            .field("waiter_max_attempts", &self.waiter_max_attempts)
            .field("attempts", &self.attempts)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl<F: EmrClientFactory> Trigger for EmrTerminateJobFlowTrigger<F> {
    fn classpath(&self) -> &'static str {
        EMR_TERMINATE_JOB_FLOW_TRIGGER_CLASSPATH
    }

    fn kwargs(&self) -> Result<JsonValue, JsonSerdeError> {
        serialize(&TriggerKwargs {
            job_flow_id: self.job_flow_id.clone(),
            waiter_delay: self.waiter_delay.as_secs(),
            waiter_max_attempts: self.waiter_max_attempts,
            aws_conn_id: Some(self.aws_conn_id.clone()),
        })
    }

    fn poll_interval(&self) -> time::Duration {
        self.waiter_delay
    }

    async fn poll(&mut self) -> TriggerPoll {
        self.attempts += 1;

        match self.describe().await {
            Ok(response) => {
                self.request_failures = 0;
                match response.state() {
                    ClusterState::Terminated => {
                        info!("JobFlow {} terminated", self.job_flow_id);
                        return self.fire(TriggerEvent::success());
                    }
                    ClusterState::TerminatedWithErrors => {
                        let reason = response
                            .state_change_message()
                            .unwrap_or("no reason given")
                            .to_string();
                        return self.fail(&format!(
                            "Error while terminating EMR cluster: TERMINATED_WITH_ERRORS ({reason})"
                        ));
                    }
                    state => {
                        info!(
                            "JobFlow {} is {state}, attempt {}/{}",
                            self.job_flow_id, self.attempts, self.waiter_max_attempts
                        );
                    }
                }
            }
            Err(e) => {
                self.request_failures += 1;
                warn!(
                    "Failed to check JobFlow {} ({}/{}): {e}",
                    self.job_flow_id, self.request_failures, self.max_request_failures
                );
                if self.request_failures >= self.max_request_failures {
                    return self.fail(&format!("Error while terminating EMR cluster: {e}"));
                }
            }
        }

        if self.attempts >= self.waiter_max_attempts {
            return self.fail("Terminate EMR Job Flow failed: max attempts reached");
        }
        TriggerPoll::Pending
    }

    fn cleanup(&mut self) {
        if self.client.take().is_some() {
            debug!("Released EMR session for {}", self.job_flow_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use airflow_task_sdk::triggers::{
        MockTriggerRuntime, TriggerEventStatus, TriggerRunner, TriggerSignal,
    };
    use serde_json::json;

    use super::*;
    use crate::hooks::{EmrCall, MockEmrClient, MockEmrClientFactory};

    static JOB_FLOW_ID: &str = "j-8989898989";

    fn trigger(client: MockEmrClient) -> EmrTerminateJobFlowTrigger<MockEmrClientFactory> {
        EmrTerminateJobFlowTrigger::new(JOB_FLOW_ID, MockEmrClientFactory::new(client))
    }

    #[test]
    fn test_kwargs() {
        let trigger = trigger(MockEmrClient::default());

        assert_eq!(
            trigger.classpath(),
            "airflow.providers.amazon.aws.triggers.emr.EmrTerminateJobFlowTrigger"
        );
        assert_eq!(
            trigger.kwargs().unwrap(),
            json!({
                "job_flow_id": "j-8989898989",
                "waiter_delay": 30,
                "waiter_max_attempts": 60,
                "aws_conn_id": "aws_default"
            })
        );
    }

    #[test]
    fn test_from_kwargs() {
        let kwargs = json!({
            "job_flow_id": "j-1",
            "waiter_delay": 60,
            "waiter_max_attempts": 20,
            "aws_conn_id": "emr"
        });

        let trigger =
            EmrTerminateJobFlowTrigger::from_kwargs(&kwargs, MockEmrClientFactory::default())
                .unwrap();

        assert_eq!(trigger.job_flow_id(), "j-1");
        assert_eq!(trigger.aws_conn_id(), "emr");
        assert_eq!(trigger.waiter_delay(), time::Duration::from_secs(60));
        assert_eq!(trigger.waiter_max_attempts(), 20);
        assert_eq!(trigger.kwargs().unwrap(), kwargs);
    }

    #[test]
    fn test_from_kwargs_without_conn_id() {
        let kwargs = json!({"job_flow_id": "j-1", "waiter_delay": 60, "waiter_max_attempts": 20});
        let trigger =
            EmrTerminateJobFlowTrigger::from_kwargs(&kwargs, MockEmrClientFactory::default())
                .unwrap();
        assert_eq!(trigger.aws_conn_id(), "aws_default");
    }

    #[tokio::test]
    async fn test_fires_once_on_third_poll() {
        let client = MockEmrClient::default()
            .then_state(ClusterState::Terminating)
            .then_state(ClusterState::Terminating)
            .then_state(ClusterState::Terminated);
        let mut runner = TriggerRunner::new(MockTriggerRuntime::new());

        let event = runner.run(trigger(client.clone())).await;

        assert_eq!(
            event,
            Some(TriggerEvent::success().with("job_flow_id", JOB_FLOW_ID))
        );
        assert_eq!(client.describe_calls(), 3);
        assert_eq!(client.terminate_calls(), 0);
        assert_eq!(client.sessions(), 1);
        assert_eq!(
            runner.into_runtime().sleeps(),
            &[time::Duration::from_secs(30); 2]
        );
    }

    #[tokio::test]
    async fn test_no_event_before_terminal_state() {
        let client = MockEmrClient::default()
            .then_state(ClusterState::Terminating)
            .then_state(ClusterState::Terminated);
        let mut trigger = trigger(client);

        assert_eq!(trigger.poll().await, TriggerPoll::Pending);
        assert!(trigger.is_connected());
        assert!(matches!(trigger.poll().await, TriggerPoll::Ready(_)));
        assert!(!trigger.is_connected());
    }

    #[tokio::test]
    async fn test_terminated_with_errors() {
        let client = MockEmrClient::default().then_state(ClusterState::TerminatedWithErrors);
        let mut trigger = trigger(client);

        let TriggerPoll::Ready(event) = trigger.poll().await else {
            panic!("trigger did not fire");
        };

        assert_eq!(event.status(), TriggerEventStatus::Error);
        assert_eq!(event.get("job_flow_id"), Some(&json!(JOB_FLOW_ID)));
        assert!(
            event
                .message()
                .is_some_and(|m| m.contains("TERMINATED_WITH_ERRORS"))
        );
    }

    #[tokio::test]
    async fn test_cancel_between_polls() {
        let client = MockEmrClient::default().then_state(ClusterState::Terminating);
        let runtime = MockTriggerRuntime::new()
            .then(None)
            .then(Some(TriggerSignal::Cancel));
        let mut runner = TriggerRunner::new(runtime);

        let event = runner.run(trigger(client.clone())).await;

        assert_eq!(event, None);
        assert_eq!(client.describe_calls(), 2);
        assert_eq!(runner.into_runtime().sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_releases_session() {
        let client = MockEmrClient::default().then_state(ClusterState::Running);
        let mut trigger = trigger(client.clone());

        assert_eq!(trigger.poll().await, TriggerPoll::Pending);
        assert!(trigger.is_connected());

        trigger.cleanup();
        assert!(!trigger.is_connected());

        trigger.poll().await;
        assert_eq!(client.sessions(), 2);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let client = MockEmrClient::default()
            .then_error("throttled")
            .then_error("throttled")
            .then_state(ClusterState::Terminated);
        let mut runner = TriggerRunner::new(MockTriggerRuntime::new());

        let event = runner.run(trigger(client.clone())).await;

        assert!(event.is_some_and(|e| e.is_success()));
        assert_eq!(client.describe_calls(), 3);
    }

    #[tokio::test]
    async fn test_request_failure_limit() {
        let client = MockEmrClient::default().then_error("connection reset");
        let mut runner = TriggerRunner::new(MockTriggerRuntime::new());

        let event = runner
            .run(trigger(client.clone()).with_max_request_failures(2))
            .await
            .unwrap();

        assert!(!event.is_success());
        assert!(event.message().is_some_and(|m| m.contains("connection reset")));
        assert_eq!(client.describe_calls(), 2);
    }

    #[tokio::test]
    async fn test_max_attempts() {
        let client = MockEmrClient::default().then_state(ClusterState::Terminating);
        let mut runner = TriggerRunner::new(MockTriggerRuntime::new());

        let event = runner
            .run(trigger(client.clone()).with_waiter_max_attempts(4))
            .await
            .unwrap();

        assert!(!event.is_success());
        assert_eq!(client.describe_calls(), 4);
        assert_eq!(
            client.calls().last(),
            Some(&EmrCall::DescribeCluster(JOB_FLOW_ID.to_string()))
        );
    }

    #[tokio::test]
    async fn test_session_failures_are_retried() {
        let client = MockEmrClient::default()
            .with_session_errors(2)
            .then_state(ClusterState::Terminated);
        let mut runner = TriggerRunner::new(MockTriggerRuntime::new());

        let event = runner.run(trigger(client.clone())).await;

        assert_eq!(
            event,
            Some(TriggerEvent::success().with("job_flow_id", JOB_FLOW_ID))
        );
        assert_eq!(client.sessions(), 1);
        assert_eq!(client.describe_calls(), 1);
    }

    #[tokio::test]
    async fn test_session_failure_limit() {
        let client = MockEmrClient::default()
            .with_session_errors(3)
            .then_state(ClusterState::Terminated);
        let mut runner = TriggerRunner::new(MockTriggerRuntime::new());

        let event = runner.run(trigger(client.clone())).await.unwrap();

        assert!(!event.is_success());
        assert!(
            event
                .message()
                .is_some_and(|m| m.contains("Failed to create EMR session"))
        );
        assert_eq!(client.sessions(), 0);
        assert!(client.calls().is_empty());
    }
}
