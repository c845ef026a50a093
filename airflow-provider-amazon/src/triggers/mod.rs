mod emr;

pub use emr::EMR_TERMINATE_JOB_FLOW_TRIGGER_CLASSPATH;
pub use emr::EmrTerminateJobFlowTrigger;
