use std::error;

use aws_config::BehaviorVersion;
use aws_sdk_emr::{
    Client,
    config::{Credentials, Region, http::HttpResponse},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::RequestId,
    types,
};
use log::debug;

use crate::hooks::{
    AwsConnection, AwsConnectionError, Cluster, ClusterState, ClusterStatus,
    DescribeClusterResponse, EmrApi, EmrApiError, EmrClientFactory, ResponseMetadata,
    StateChangeReason, TerminateJobFlowsResponse,
};

static CREDENTIALS_PROVIDER: &str = "airflow-connection";

#[derive(thiserror::Error, Debug)]
pub enum AwsEmrError {
    /// The request could not be built, sent or its response could not be read.
    #[error("{0}")]
    Sdk(String),
    #[error(transparent)]
    Connection(#[from] AwsConnectionError),
}

/// An [EmrApi] implementation using the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsEmrClient {
    client: Client,
}

impl AwsEmrClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client for the given connection.
    ///
    /// Whatever the connection leaves open is resolved by the default provider chains.
    pub async fn from_connection(connection: &AwsConnection) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region_name) = connection.region_name() {
            loader = loader.region(Region::new(region_name.to_string()));
        }
        if let Some(profile_name) = connection.profile_name() {
            loader = loader.profile_name(profile_name);
        }
        if let Some(endpoint_url) = connection.endpoint_url() {
            loader = loader.endpoint_url(endpoint_url);
        }
        if let Some(credentials) = connection.credentials() {
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key_id(),
                credentials.secret_access_key().secret(),
                credentials.session_token().map(|t| t.secret().to_string()),
                None,
                CREDENTIALS_PROVIDER,
            ));
        }
        let config = loader.load().await;
        debug!(
            "Loaded AWS config for connection {} (region {:?})",
            connection.conn_id(),
            config.region()
        );
        Self::new(Client::new(&config))
    }
}

impl EmrApi for AwsEmrClient {
    type Error = AwsEmrError;

    async fn terminate_job_flows(
        &mut self,
        job_flow_ids: &[&str],
    ) -> Result<TerminateJobFlowsResponse, EmrApiError<Self::Error>> {
        let job_flow_ids = job_flow_ids.iter().map(|id| id.to_string()).collect();
        let output = self
            .client
            .terminate_job_flows()
            .set_job_flow_ids(Some(job_flow_ids))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(TerminateJobFlowsResponse {
            response_metadata: ResponseMetadata {
                http_status_code: 200,
                request_id: output.request_id().map(str::to_string),
            },
        })
    }

    async fn describe_cluster(
        &mut self,
        cluster_id: &str,
    ) -> Result<DescribeClusterResponse, EmrApiError<Self::Error>> {
        let output = self
            .client
            .describe_cluster()
            .cluster_id(cluster_id)
            .send()
            .await
            .map_err(sdk_error)?;
        let cluster = output.cluster().ok_or_else(|| {
            EmrApiError::Other(format!("No cluster in response for {cluster_id}"))
        })?;
        Ok(DescribeClusterResponse {
            cluster: cluster_from_sdk(cluster_id, cluster),
        })
    }
}

fn cluster_from_sdk(cluster_id: &str, cluster: &types::Cluster) -> Cluster {
    let status = cluster.status();
    let state = status
        .and_then(|s| s.state())
        .map(|s| ClusterState::from(s.as_str()))
        .unwrap_or(ClusterState::Unknown);
    let state_change_reason = status
        .and_then(|s| s.state_change_reason())
        .map(|reason| StateChangeReason {
            code: reason.code().map(|code| code.as_str().to_string()),
            message: reason.message().map(str::to_string),
        });
    Cluster {
        id: cluster.id().unwrap_or(cluster_id).to_string(),
        name: cluster.name().map(str::to_string),
        status: ClusterStatus {
            state,
            state_change_reason,
        },
    }
}

/// Rejections by AWS keep their status and error code, everything else is a client error.
fn sdk_error<E>(error: SdkError<E, HttpResponse>) -> EmrApiError<AwsEmrError>
where
    E: ProvideErrorMetadata + error::Error + 'static,
{
    if let SdkError::ServiceError(service) = &error {
        let err = service.err();
        return EmrApiError::Service {
            status: service.raw().status().as_u16(),
            code: err.code().unwrap_or("Unknown").to_string(),
            message: err.message().unwrap_or_default().to_string(),
        };
    }
    EmrApiError::Client(AwsEmrError::Sdk(DisplayErrorContext(&error).to_string()))
}

/// Creates an [AwsEmrClient] per session, from `AIRFLOW_CONN_{ID}` unless a connection is
/// given.
#[derive(Debug, Clone, Default)]
pub struct AwsEmrClientFactory {
    connection: Option<AwsConnection>,
}

impl AwsEmrClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this connection regardless of the requested connection id.
    pub fn with_connection(mut self, connection: AwsConnection) -> Self {
        self.connection = Some(connection);
        self
    }
}

impl EmrClientFactory for AwsEmrClientFactory {
    type Client = AwsEmrClient;
    type Error = AwsEmrError;

    async fn create(&self, aws_conn_id: &str) -> Result<Self::Client, Self::Error> {
        let connection = match &self.connection {
            Some(connection) => connection.clone(),
            None => AwsConnection::from_env(aws_conn_id)?,
        };
        Ok(AwsEmrClient::from_connection(&connection).await)
    }
}
