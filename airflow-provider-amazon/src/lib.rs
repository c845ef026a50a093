//! Amazon Web Services integration for airflow-rs.
//!
//! Currently covers terminating EMR job flows, either waiting in the task or deferring to a
//! trigger.

pub mod hooks;
pub mod operators;
pub mod triggers;

pub mod prelude {
    pub use crate::hooks::{
        AwsConnection, AwsEmrClient, AwsEmrClientFactory, EmrApi, EmrClientFactory, LocalEmrApi,
    };
    pub use crate::operators::EmrTerminateJobFlowOperator;
    pub use crate::triggers::EmrTerminateJobFlowTrigger;
}
