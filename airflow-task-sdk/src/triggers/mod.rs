mod base;
mod runner;

pub use base::LocalTrigger;
pub use base::Trigger;
pub use base::TriggerEvent;
pub use base::TriggerEventStatus;
pub use base::TriggerPoll;
pub use runner::LocalTriggerRuntime;
pub use runner::MockTriggerRuntime;
pub use runner::TriggerRunner;
pub use runner::TriggerRuntime;
pub use runner::TriggerSignal;
pub use runner::TRIGGER_TIMEOUT_MESSAGE;
