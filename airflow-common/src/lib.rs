#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
#[macro_use]
extern crate alloc;

#[cfg(feature = "std")]
pub mod configuration;
pub mod datetime;
pub mod models;
pub mod serialization;
pub mod utils;

pub mod prelude {
    pub use crate::datetime::TimeProvider;
    pub use crate::models::UniqueTaskInstanceId;
    pub use crate::utils::SecretString;
}
