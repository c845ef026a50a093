use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::hooks::{
    Cluster, ClusterState, ClusterStatus, DescribeClusterResponse, EmrApi, EmrApiError,
    EmrClientFactory, ResponseMetadata, StateChangeReason, TerminateJobFlowsResponse,
};

/// Error of a scripted EMR call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct MockEmrError(pub String);

/// A call received by a [MockEmrClient].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmrCall {
    TerminateJobFlows(Vec<String>),
    DescribeCluster(String),
}

#[derive(Debug)]
struct MockEmrState {
    terminate_status: u16,
    terminate_error: Option<String>,
    describe_script: VecDeque<Result<ClusterState, String>>,
    calls: Vec<EmrCall>,
    sessions: usize,
    session_errors: usize,
}

/// An in-memory EMR client with scripted responses.
///
/// Clones share their state, so a test can keep a handle while the operator or trigger owns
/// the client. Once the describe script is exhausted, the last scripted state is repeated.
#[derive(Debug, Clone)]
pub struct MockEmrClient {
    state: Arc<Mutex<MockEmrState>>,
}

impl Default for MockEmrClient {
    fn default() -> Self {
        MockEmrClient {
            state: Arc::new(Mutex::new(MockEmrState {
                terminate_status: 200,
                terminate_error: None,
                describe_script: VecDeque::new(),
                calls: Vec::new(),
                sessions: 0,
                session_errors: 0,
            })),
        }
    }
}

impl MockEmrClient {
    fn lock(&self) -> MutexGuard<'_, MockEmrState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The HTTP status code the termination call reports.
    pub fn with_terminate_status(self, status: u16) -> Self {
        self.lock().terminate_status = status;
        self
    }

    /// Make the termination call fail before it reaches the service.
    pub fn with_terminate_error(self, message: &str) -> Self {
        self.lock().terminate_error = Some(message.to_string());
        self
    }

    /// Append a cluster state to the describe script.
    pub fn then_state(self, state: ClusterState) -> Self {
        self.lock().describe_script.push_back(Ok(state));
        self
    }

    /// Append a failing describe call to the describe script.
    pub fn then_error(self, message: &str) -> Self {
        self.lock()
            .describe_script
            .push_back(Err(message.to_string()));
        self
    }

    /// Make the next `count` sessions of a [MockEmrClientFactory] fail to be created.
    pub fn with_session_errors(self, count: usize) -> Self {
        self.lock().session_errors = count;
        self
    }

    pub fn calls(&self) -> Vec<EmrCall> {
        self.lock().calls.clone()
    }

    pub fn terminate_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, EmrCall::TerminateJobFlows(_)))
            .count()
    }

    pub fn describe_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, EmrCall::DescribeCluster(_)))
            .count()
    }

    /// How many sessions have been created successfully by a [MockEmrClientFactory].
    pub fn sessions(&self) -> usize {
        self.lock().sessions
    }
}

impl EmrApi for MockEmrClient {
    type Error = MockEmrError;

    async fn terminate_job_flows(
        &mut self,
        job_flow_ids: &[&str],
    ) -> Result<TerminateJobFlowsResponse, EmrApiError<Self::Error>> {
        let mut state = self.lock();
        state.calls.push(EmrCall::TerminateJobFlows(
            job_flow_ids.iter().map(|id| id.to_string()).collect(),
        ));
        if let Some(message) = &state.terminate_error {
            return Err(EmrApiError::Client(MockEmrError(message.clone())));
        }
        Ok(TerminateJobFlowsResponse {
            response_metadata: ResponseMetadata {
                http_status_code: state.terminate_status,
                request_id: Some("mock".to_string()),
            },
        })
    }

    async fn describe_cluster(
        &mut self,
        cluster_id: &str,
    ) -> Result<DescribeClusterResponse, EmrApiError<Self::Error>> {
        let mut state = self.lock();
        state
            .calls
            .push(EmrCall::DescribeCluster(cluster_id.to_string()));
        let next = if state.describe_script.len() > 1 {
            state.describe_script.pop_front()
        } else {
            state.describe_script.front().cloned()
        };
        match next {
            Some(Ok(cluster_state)) => Ok(describe_response(cluster_id, cluster_state)),
            Some(Err(message)) => Err(EmrApiError::Client(MockEmrError(message))),
            None => Err(EmrApiError::Service {
                status: 400,
                code: "InvalidRequestException".to_string(),
                message: format!("Cluster id '{cluster_id}' is not valid."),
            }),
        }
    }
}

fn describe_response(cluster_id: &str, state: ClusterState) -> DescribeClusterResponse {
    let state_change_reason = match state {
        ClusterState::TerminatedWithErrors => Some(StateChangeReason {
            code: Some("INTERNAL_ERROR".to_string()),
            message: Some("Terminated with errors".to_string()),
        }),
        _ => None,
    };
    DescribeClusterResponse {
        cluster: Cluster {
            id: cluster_id.to_string(),
            name: None,
            status: ClusterStatus {
                state,
                state_change_reason,
            },
        },
    }
}

/// Hands out clones of a [MockEmrClient] and counts the sessions created.
#[derive(Debug, Clone, Default)]
pub struct MockEmrClientFactory {
    client: MockEmrClient,
}

impl MockEmrClientFactory {
    pub fn new(client: MockEmrClient) -> Self {
        MockEmrClientFactory { client }
    }

    pub fn client(&self) -> &MockEmrClient {
        &self.client
    }
}

impl EmrClientFactory for MockEmrClientFactory {
    type Client = MockEmrClient;
    type Error = MockEmrError;

    async fn create(&self, aws_conn_id: &str) -> Result<Self::Client, Self::Error> {
        let mut state = self.client.lock();
        if state.session_errors > 0 {
            state.session_errors -= 1;
            return Err(MockEmrError(format!(
                "Unable to load credentials for {aws_conn_id}"
            )));
        }
        state.sessions += 1;
        Ok(self.client.clone())
    }
}
