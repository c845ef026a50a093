mod context;
mod operator;
mod task;

pub use context::Context;
pub use operator::LocalOperator;
pub use operator::Operator;
pub use task::TaskDeferred;
pub use task::TaskError;
pub use task::TaskOutcome;
