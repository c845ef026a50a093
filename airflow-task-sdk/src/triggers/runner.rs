cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        use std::collections::VecDeque;
        use std::time;
    } else {
        extern crate alloc;
        use alloc::collections::VecDeque;
        use alloc::vec::Vec;
        use core::time;
    }
}

use airflow_common::datetime::{MockTimeProvider, TimeProvider, UtcDateTime};
use log::{debug, info, warn};

use crate::triggers::{LocalTrigger, TriggerEvent, TriggerPoll};

/// The message of the event fired when a trigger ran out of time.
pub static TRIGGER_TIMEOUT_MESSAGE: &str = "Trigger timed out";

/// Signals the owner of a trigger can send while the trigger sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSignal {
    /// Stop the trigger without firing an event.
    Cancel,
}

/// The event loop a trigger runs in. Its clock is the one trigger timeouts are measured with.
#[trait_variant::make(TriggerRuntime: Send)]
pub trait LocalTriggerRuntime: TimeProvider {
    /// Suspend for the given duration, or less if a signal arrives in the meantime.
    async fn sleep(&mut self, duration: time::Duration) -> Option<TriggerSignal>;
}

/// Drives a single trigger until it fires, times out or gets cancelled.
#[derive(Debug)]
pub struct TriggerRunner<R> {
    runtime: R,
}

impl<R: LocalTriggerRuntime> TriggerRunner<R> {
    pub fn new(runtime: R) -> Self {
        TriggerRunner { runtime }
    }

    /// Run the trigger to completion.
    ///
    /// The trigger is polled right away and then once per poll interval. Cancellation is only
    /// observed while sleeping between two polls, so a poll in flight always finishes.
    /// Returns `None` if the trigger got cancelled.
    pub async fn run<T: LocalTrigger>(&mut self, trigger: T) -> Option<TriggerEvent> {
        self.run_until(trigger, None).await
    }

    /// Run the trigger like [TriggerRunner::run], but give up once `timeout` has passed.
    ///
    /// The deadline is checked between polls only. Sleeps are cut short to end at the
    /// deadline. A trigger which times out is cleaned up and yields an error event with
    /// [TRIGGER_TIMEOUT_MESSAGE].
    pub async fn run_with_timeout<T: LocalTrigger>(
        &mut self,
        trigger: T,
        timeout: time::Duration,
    ) -> Option<TriggerEvent> {
        let deadline = chrono::TimeDelta::from_std(timeout)
            .ok()
            .and_then(|timeout| self.runtime.now().checked_add_signed(timeout));
        self.run_until(trigger, deadline).await
    }

    async fn run_until<T: LocalTrigger>(
        &mut self,
        mut trigger: T,
        deadline: Option<UtcDateTime>,
    ) -> Option<TriggerEvent> {
        let mut polls: usize = 0;
        let event = loop {
            polls += 1;
            debug!("Polling {} (poll {})", trigger.classpath(), polls);
            if let TriggerPoll::Ready(event) = trigger.poll().await {
                info!(
                    "Trigger {} fired after {} polls: {}",
                    trigger.classpath(),
                    polls,
                    event
                );
                break Some(event);
            }

            let mut interval = trigger.poll_interval();
            if let Some(deadline) = deadline {
                let remaining = self.remaining(deadline);
                if remaining.is_zero() {
                    break Some(timed_out(&trigger, polls));
                }
                interval = interval.min(remaining);
            }

            match self.runtime.sleep(interval).await {
                Some(TriggerSignal::Cancel) => {
                    info!(
                        "Trigger {} cancelled after {} polls",
                        trigger.classpath(),
                        polls
                    );
                    break None;
                }
                None => {}
            }

            if deadline.is_some_and(|deadline| self.remaining(deadline).is_zero()) {
                break Some(timed_out(&trigger, polls));
            }
        };
        trigger.cleanup();
        event
    }

    fn remaining(&self, deadline: UtcDateTime) -> time::Duration {
        (deadline - self.runtime.now())
            .to_std()
            .unwrap_or_default()
    }

    pub fn into_runtime(self) -> R {
        self.runtime
    }
}

fn timed_out<T: LocalTrigger>(trigger: &T, polls: usize) -> TriggerEvent {
    warn!(
        "Trigger {} timed out after {} polls",
        trigger.classpath(),
        polls
    );
    TriggerEvent::error(TRIGGER_TIMEOUT_MESSAGE)
}

/// A runtime which returns immediately from every sleep.
///
/// It replays the given signals, one per sleep, and records the requested durations. Its clock
/// starts at the Unix epoch and moves forward by every sleep which was not interrupted.
#[derive(Debug)]
pub struct MockTriggerRuntime {
    clock: MockTimeProvider,
    signals: VecDeque<Option<TriggerSignal>>,
    sleeps: Vec<time::Duration>,
}

impl Default for MockTriggerRuntime {
    fn default() -> Self {
        MockTriggerRuntime {
            clock: MockTimeProvider::new(UtcDateTime::default()),
            signals: VecDeque::new(),
            sleeps: Vec::new(),
        }
    }
}

impl MockTriggerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `signal` on the sleep following the ones scripted so far.
    pub fn then(mut self, signal: Option<TriggerSignal>) -> Self {
        self.signals.push_back(signal);
        self
    }

    pub fn sleeps(&self) -> &[time::Duration] {
        &self.sleeps
    }
}

impl TimeProvider for MockTriggerRuntime {
    fn now(&self) -> UtcDateTime {
        self.clock.now()
    }
}

impl TriggerRuntime for MockTriggerRuntime {
    async fn sleep(&mut self, duration: time::Duration) -> Option<TriggerSignal> {
        self.sleeps.push(duration);
        let signal = self.signals.pop_front().flatten();
        if signal.is_none() {
            self.clock.advance(duration);
        }
        signal
    }
}

#[cfg(test)]
mod tests {
    use airflow_common::serialization::serde::{JsonSerdeError, JsonValue};

    use super::*;
    use crate::triggers::Trigger;

    /// Fires on the given poll.
    #[derive(Debug)]
    struct CountdownTrigger {
        fire_on: usize,
        polls: usize,
        cleaned_up: bool,
    }

    impl CountdownTrigger {
        fn new(fire_on: usize) -> Self {
            CountdownTrigger {
                fire_on,
                polls: 0,
                cleaned_up: false,
            }
        }
    }

    impl Trigger for &mut CountdownTrigger {
        fn classpath(&self) -> &'static str {
            "tests.CountdownTrigger"
        }

        fn kwargs(&self) -> Result<JsonValue, JsonSerdeError> {
            Ok(JsonValue::Null)
        }

        fn poll_interval(&self) -> time::Duration {
            time::Duration::from_secs(30)
        }

        async fn poll(&mut self) -> TriggerPoll {
            self.polls += 1;
            if self.polls == self.fire_on {
                TriggerPoll::Ready(TriggerEvent::success())
            } else {
                TriggerPoll::Pending
            }
        }

        fn cleanup(&mut self) {
            self.cleaned_up = true;
        }
    }

    #[tokio::test]
    async fn test_fires_on_third_poll() {
        let mut trigger = CountdownTrigger::new(3);
        let mut runner = TriggerRunner::new(MockTriggerRuntime::new());

        let event = runner.run(&mut trigger).await;

        assert_eq!(event, Some(TriggerEvent::success()));
        assert_eq!(trigger.polls, 3);
        assert!(trigger.cleaned_up);
        let runtime = runner.into_runtime();
        assert_eq!(runtime.sleeps(), &[time::Duration::from_secs(30); 2]);
    }

    #[tokio::test]
    async fn test_fires_on_first_poll_without_sleeping() {
        let mut trigger = CountdownTrigger::new(1);
        let mut runner = TriggerRunner::new(MockTriggerRuntime::new());

        assert!(runner.run(&mut trigger).await.is_some());
        assert!(runner.into_runtime().sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_between_polls() {
        let mut trigger = CountdownTrigger::new(3);
        let runtime = MockTriggerRuntime::new()
            .then(None)
            .then(Some(TriggerSignal::Cancel));
        let mut runner = TriggerRunner::new(runtime);

        let event = runner.run(&mut trigger).await;

        assert_eq!(event, None);
        assert_eq!(trigger.polls, 2);
        assert!(trigger.cleaned_up);
    }

    #[tokio::test]
    async fn test_timeout_cuts_last_sleep_short() {
        let mut trigger = CountdownTrigger::new(usize::MAX);
        let mut runner = TriggerRunner::new(MockTriggerRuntime::new());

        let event = runner
            .run_with_timeout(&mut trigger, time::Duration::from_secs(75))
            .await;

        assert_eq!(event, Some(TriggerEvent::error(TRIGGER_TIMEOUT_MESSAGE)));
        assert_eq!(trigger.polls, 3);
        assert!(trigger.cleaned_up);
        assert_eq!(
            runner.into_runtime().sleeps(),
            &[
                time::Duration::from_secs(30),
                time::Duration::from_secs(30),
                time::Duration::from_secs(15)
            ]
        );
    }

    #[tokio::test]
    async fn test_fires_before_timeout() {
        let mut trigger = CountdownTrigger::new(2);
        let mut runner = TriggerRunner::new(MockTriggerRuntime::new());

        let event = runner
            .run_with_timeout(&mut trigger, time::Duration::from_secs(3600))
            .await;

        assert_eq!(event, Some(TriggerEvent::success()));
        assert_eq!(trigger.polls, 2);
    }

    #[tokio::test]
    async fn test_cancel_before_timeout() {
        let mut trigger = CountdownTrigger::new(usize::MAX);
        let runtime = MockTriggerRuntime::new().then(Some(TriggerSignal::Cancel));
        let mut runner = TriggerRunner::new(runtime);

        let event = runner
            .run_with_timeout(&mut trigger, time::Duration::from_secs(10))
            .await;

        assert_eq!(event, None);
        assert!(trigger.cleaned_up);
        assert_eq!(runner.into_runtime().sleeps(), &[time::Duration::from_secs(10)]);
    }
}
