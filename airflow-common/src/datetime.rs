cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        use std::time;
    } else {
        use core::time;
    }
}

/// A UTC date time as used throughout Airflow.
pub type UtcDateTime = chrono::DateTime<chrono::Utc>;

/// A trait for providing the current time as a [UtcDateTime].
pub trait TimeProvider {
    fn now(&self) -> UtcDateTime;
}

/// A time provider that uses the system clock to get the current time.
#[cfg(feature = "now")]
#[derive(Debug, Clone, Copy, Default)]
pub struct StdTimeProvider;

#[cfg(feature = "now")]
impl TimeProvider for StdTimeProvider {
    fn now(&self) -> UtcDateTime {
        chrono::Utc::now()
    }
}

/// A time provider which always returns a fixed time, unless advanced manually.
#[derive(Debug, Clone, Copy)]
pub struct MockTimeProvider {
    now: UtcDateTime,
}

impl MockTimeProvider {
    pub fn new(now: UtcDateTime) -> Self {
        MockTimeProvider { now }
    }

    /// Move the clock forward by the given duration.
    /// Durations beyond what chrono can represent leave the clock unchanged.
    pub fn advance(&mut self, duration: time::Duration) {
        if let Ok(delta) = chrono::TimeDelta::from_std(duration)
            && let Some(now) = self.now.checked_add_signed(delta)
        {
            self.now = now;
        }
    }
}

impl TimeProvider for MockTimeProvider {
    fn now(&self) -> UtcDateTime {
        self.now
    }
}
