#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
#[macro_use]
extern crate alloc;

pub mod definitions;
pub mod execution;
pub mod triggers;

pub mod prelude {
    pub use crate::definitions::{
        Context, LocalOperator, Operator, TaskDeferred, TaskError, TaskOutcome,
    };
    pub use crate::triggers::{
        LocalTrigger, LocalTriggerRuntime, Trigger, TriggerEvent, TriggerPoll, TriggerRunner,
        TriggerRuntime, TriggerSignal,
    };
}
