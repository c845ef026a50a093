use airflow_provider_amazon::{hooks::AwsEmrClientFactory, operators::EmrTerminateJobFlowOperator};

pub mod tokio;

pub type StdTerminateJobFlowOperator = EmrTerminateJobFlowOperator<AwsEmrClientFactory>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}
