mod state;

pub use state::ExecutionTIState;
