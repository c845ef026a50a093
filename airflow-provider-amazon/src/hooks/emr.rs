use std::{error, fmt};

/// Metadata AWS attaches to every response.
///
/// The AWS SDK only hands out successful responses, other clients may report any status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub http_status_code: u16,
    pub request_id: Option<String>,
}

impl ResponseMetadata {
    pub fn is_ok(&self) -> bool {
        self.http_status_code == 200
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminateJobFlowsResponse {
    pub response_metadata: ResponseMetadata,
}

impl fmt::Display for TerminateJobFlowsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{'ResponseMetadata': {{'HTTPStatusCode': {}, 'RequestId': '{}'}}}}",
            self.response_metadata.http_status_code,
            self.response_metadata.request_id.as_deref().unwrap_or("")
        )
    }
}

/// The state of an EMR cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Starting,
    Bootstrapping,
    Running,
    Waiting,
    Terminating,
    Terminated,
    TerminatedWithErrors,
    /// A state this crate does not know about.
    Unknown,
}

impl ClusterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterState::Starting => "STARTING",
            ClusterState::Bootstrapping => "BOOTSTRAPPING",
            ClusterState::Running => "RUNNING",
            ClusterState::Waiting => "WAITING",
            ClusterState::Terminating => "TERMINATING",
            ClusterState::Terminated => "TERMINATED",
            ClusterState::TerminatedWithErrors => "TERMINATED_WITH_ERRORS",
            ClusterState::Unknown => "UNKNOWN",
        }
    }

    /// A cluster in a terminal state will not change its state anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClusterState::Terminated | ClusterState::TerminatedWithErrors
        )
    }
}

impl From<&str> for ClusterState {
    fn from(state: &str) -> Self {
        match state {
            "STARTING" => ClusterState::Starting,
            "BOOTSTRAPPING" => ClusterState::Bootstrapping,
            "RUNNING" => ClusterState::Running,
            "WAITING" => ClusterState::Waiting,
            "TERMINATING" => ClusterState::Terminating,
            "TERMINATED" => ClusterState::Terminated,
            "TERMINATED_WITH_ERRORS" => ClusterState::TerminatedWithErrors,
            _ => ClusterState::Unknown,
        }
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangeReason {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterStatus {
    pub state: ClusterState,
    pub state_change_reason: Option<StateChangeReason>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub id: String,
    pub name: Option<String>,
    pub status: ClusterStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeClusterResponse {
    pub cluster: Cluster,
}

impl DescribeClusterResponse {
    pub fn state(&self) -> ClusterState {
        self.cluster.status.state
    }

    /// The human readable reason of the last state change, if AWS gave one.
    pub fn state_change_message(&self) -> Option<&str> {
        self.cluster
            .status
            .state_change_reason
            .as_ref()
            .and_then(|r| r.message.as_deref())
    }
}

/// An error which can occur when calling the EMR API.
#[derive(thiserror::Error, Debug)]
pub enum EmrApiError<E: error::Error> {
    /// The request could not be sent or its response could not be read.
    #[error(transparent)]
    Client(#[from] E),
    /// AWS rejected the request.
    #[error("{code} ({status}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },
    #[error("{0}")]
    Other(String),
}

/// The EMR operations the terminate operator and trigger need.
#[trait_variant::make(EmrApi: Send)]
pub trait LocalEmrApi {
    type Error: error::Error;

    /// Shut down the given job flows.
    async fn terminate_job_flows(
        &mut self,
        job_flow_ids: &[&str],
    ) -> Result<TerminateJobFlowsResponse, EmrApiError<Self::Error>>;

    async fn describe_cluster(
        &mut self,
        cluster_id: &str,
    ) -> Result<DescribeClusterResponse, EmrApiError<Self::Error>>;
}

/// Creates EMR clients from a connection id.
///
/// Each call creates a new session. Sessions are not shared between the operator and the
/// triggers it defers to.
pub trait EmrClientFactory: Clone + fmt::Debug + Send + Sync + 'static {
    type Client: EmrApi;
    type Error: error::Error + Send;

    fn create(
        &self,
        aws_conn_id: &str,
    ) -> impl Future<Output = Result<Self::Client, Self::Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_state_from_str() {
        for state in [
            ClusterState::Starting,
            ClusterState::Running,
            ClusterState::Terminating,
            ClusterState::Terminated,
            ClusterState::TerminatedWithErrors,
        ] {
            assert_eq!(ClusterState::from(state.as_str()), state);
        }
        assert!(ClusterState::from("TERMINATED_WITH_ERRORS").is_terminal());
    }

    #[test]
    fn test_unknown_state() {
        let state = ClusterState::from("HIBERNATING");
        assert_eq!(state, ClusterState::Unknown);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_state_change_message() {
        let response = DescribeClusterResponse {
            cluster: Cluster {
                id: "j-8989898989".to_string(),
                name: None,
                status: ClusterStatus {
                    state: ClusterState::TerminatedWithErrors,
                    state_change_reason: Some(StateChangeReason {
                        code: Some("BOOTSTRAP_FAILURE".to_string()),
                        message: Some("Bootstrap action failed".to_string()),
                    }),
                },
            },
        };
        assert_eq!(response.state(), ClusterState::TerminatedWithErrors);
        assert_eq!(
            response.state_change_message(),
            Some("Bootstrap action failed")
        );
    }

    #[test]
    fn test_terminate_response_display() {
        let response = TerminateJobFlowsResponse {
            response_metadata: ResponseMetadata {
                http_status_code: 400,
                request_id: Some("abc".to_string()),
            },
        };
        assert!(!response.response_metadata.is_ok());
        assert_eq!(
            response.to_string(),
            "{'ResponseMetadata': {'HTTPStatusCode': 400, 'RequestId': 'abc'}}"
        );
    }
}
