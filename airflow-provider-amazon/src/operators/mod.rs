mod emr;

pub use emr::EXECUTE_COMPLETE;
pub use emr::EmrTerminateJobFlowOperator;
