mod aws_sdk_impl;
mod base_aws;
mod emr;
mod mock;

pub use aws_sdk_impl::AwsEmrClient;
pub use aws_sdk_impl::AwsEmrClientFactory;
pub use aws_sdk_impl::AwsEmrError;
pub use base_aws::AwsConnection;
pub use base_aws::AwsConnectionError;
pub use base_aws::AwsCredentials;
pub use base_aws::DEFAULT_CONN_ID;
pub use emr::Cluster;
pub use emr::ClusterState;
pub use emr::ClusterStatus;
pub use emr::DescribeClusterResponse;
pub use emr::EmrApi;
pub use emr::EmrApiError;
pub use emr::EmrClientFactory;
pub use emr::LocalEmrApi;
pub use emr::ResponseMetadata;
pub use emr::StateChangeReason;
pub use emr::TerminateJobFlowsResponse;
pub use mock::EmrCall;
pub use mock::MockEmrClient;
pub use mock::MockEmrClientFactory;
pub use mock::MockEmrError;
