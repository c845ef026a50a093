cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        use std::fmt;
        use std::time;
    } else {
        extern crate alloc;
        use alloc::string::String;
        use alloc::string::ToString;
        use core::fmt;
        use core::time;
    }
}

use airflow_common::serialization::serde::{JsonSerdeError, JsonValue};
use serde::{Deserialize, Serialize};

static RESERVED_KEYS: [&str; 2] = ["status", "message"];

/// Whether a trigger fired because the awaited condition was met or because it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEventStatus {
    Success,
    Error,
}

/// The event a trigger fires exactly once, at the end of its life.
///
/// Serialized as a flat JSON object, e.g. `{"status": "success", "job_flow_id": "j-123"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    status: TriggerEventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(flatten)]
    payload: serde_json::Map<String, JsonValue>,
}

impl TriggerEvent {
    pub fn success() -> Self {
        TriggerEvent {
            status: TriggerEventStatus::Success,
            message: None,
            payload: serde_json::Map::new(),
        }
    }

    pub fn error(message: &str) -> Self {
        TriggerEvent {
            status: TriggerEventStatus::Error,
            message: Some(message.to_string()),
            payload: serde_json::Map::new(),
        }
    }

    /// Attach a value to the event payload.
    ///
    /// `status` and `message` are fields of the event itself, values for them are ignored.
    pub fn with(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        if RESERVED_KEYS.contains(&key) {
            return self;
        }
        self.payload.insert(key.to_string(), value.into());
        self
    }

    pub fn status(&self) -> TriggerEventStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == TriggerEventStatus::Success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.payload.get(key)
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

/// The result of a single poll of a trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerPoll {
    /// Nothing happened yet, poll again after the interval.
    Pending,
    /// The trigger fired. It must not be polled again.
    Ready(TriggerEvent),
}

/// A trigger waits for an external condition on behalf of a deferred task.
///
/// Triggers are driven by a [crate::triggers::TriggerRunner], which polls them once per interval
/// and never concurrently. All resources a trigger holds are released in [LocalTrigger::cleanup],
/// which runs whether the trigger fired or got cancelled.
#[trait_variant::make(Trigger: Send)]
pub trait LocalTrigger: fmt::Debug {
    /// The Airflow classpath of the trigger, used to recreate it from its kwargs.
    fn classpath(&self) -> &'static str;

    /// The arguments the trigger can be recreated with.
    fn kwargs(&self) -> Result<JsonValue, JsonSerdeError>;

    /// How long to wait between two polls.
    fn poll_interval(&self) -> time::Duration;

    /// Check the awaited condition once.
    async fn poll(&mut self) -> TriggerPoll;

    fn cleanup(&mut self);
}
