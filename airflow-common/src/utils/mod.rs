mod state;
mod types;

pub use state::TaskInstanceState;
pub use types::SecretString;
