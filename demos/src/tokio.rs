use std::time::Duration;

use airflow_common::datetime::{StdTimeProvider, TimeProvider, UtcDateTime};
use airflow_task_sdk::triggers::{TriggerRuntime, TriggerSignal};
use log::debug;
use tokio::{sync::mpsc, time::Instant};

/// Sends signals to a running trigger.
#[derive(Debug, Clone)]
pub struct TokioTriggerCanceller(mpsc::Sender<TriggerSignal>);

impl TokioTriggerCanceller {
    pub async fn cancel(&self) -> Result<(), mpsc::error::SendError<TriggerSignal>> {
        self.0.send(TriggerSignal::Cancel).await
    }
}

/// Runs triggers on the tokio event loop. Sleeps end early when a signal arrives.
///
/// The clock advances with tokio's clock, so a paused test clock also pauses trigger timeouts.
#[derive(Debug)]
pub struct TokioTriggerRuntime {
    recv: mpsc::Receiver<TriggerSignal>,
    send: mpsc::Sender<TriggerSignal>,
    started: Instant,
    started_at: UtcDateTime,
}

impl TokioTriggerRuntime {
    pub fn canceller(&self) -> TokioTriggerCanceller {
        TokioTriggerCanceller(self.send.clone())
    }
}

impl Default for TokioTriggerRuntime {
    fn default() -> Self {
        let (send, recv) = mpsc::channel(1);
        TokioTriggerRuntime {
            recv,
            send,
            started: Instant::now(),
            started_at: StdTimeProvider.now(),
        }
    }
}

impl TimeProvider for TokioTriggerRuntime {
    fn now(&self) -> UtcDateTime {
        chrono::TimeDelta::from_std(self.started.elapsed())
            .ok()
            .and_then(|elapsed| self.started_at.checked_add_signed(elapsed))
            .unwrap_or(UtcDateTime::MAX_UTC)
    }
}

impl TriggerRuntime for TokioTriggerRuntime {
    async fn sleep(&mut self, duration: Duration) -> Option<TriggerSignal> {
        debug!("Sleeping for {} seconds", duration.as_secs());
        tokio::select! {
            v = self.recv.recv() => v,
            _ = tokio::time::sleep(duration) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use airflow_common::serialization::serde::{JsonSerdeError, JsonValue};
    use airflow_task_sdk::triggers::{
        TRIGGER_TIMEOUT_MESSAGE, Trigger, TriggerEvent, TriggerPoll, TriggerRunner,
    };

    use super::*;

    /// Never fires. Each poll takes `poll_time`.
    #[derive(Debug, Default)]
    struct SlowTrigger {
        poll_time: Duration,
        polls: usize,
        polls_finished: usize,
        cleaned_up: bool,
    }

    impl Trigger for &mut SlowTrigger {
        fn classpath(&self) -> &'static str {
            "tests.SlowTrigger"
        }

        fn kwargs(&self) -> Result<JsonValue, JsonSerdeError> {
            Ok(JsonValue::Null)
        }

        fn poll_interval(&self) -> Duration {
            Duration::from_secs(30)
        }

        async fn poll(&mut self) -> TriggerPoll {
            self.polls += 1;
            if !self.poll_time.is_zero() {
                tokio::time::sleep(self.poll_time).await;
            }
            self.polls_finished += 1;
            TriggerPoll::Pending
        }

        fn cleanup(&mut self) {
            self.cleaned_up = true;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_elapses() {
        let mut runtime = TokioTriggerRuntime::default();
        let before = runtime.now();

        assert_eq!(runtime.sleep(Duration::from_secs(30)).await, None);
        assert_eq!((runtime.now() - before).num_seconds(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let mut runtime = TokioTriggerRuntime::default();
        let canceller = runtime.canceller();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel().await
        });

        let signal = runtime.sleep(Duration::from_secs(3600)).await;

        assert_eq!(signal, Some(TriggerSignal::Cancel));
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_lets_poll_in_flight_finish() {
        let mut trigger = SlowTrigger {
            poll_time: Duration::from_secs(10),
            ..Default::default()
        };
        let mut runner = TriggerRunner::new(TokioTriggerRuntime::default());
        let started = Instant::now();

        let event = runner
            .run_with_timeout(&mut trigger, Duration::from_secs(5))
            .await;

        assert_eq!(event, Some(TriggerEvent::error(TRIGGER_TIMEOUT_MESSAGE)));
        assert_eq!(trigger.polls, 1);
        assert_eq!(trigger.polls_finished, 1);
        assert!(trigger.cleaned_up);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_ends_sleep_at_deadline() {
        let mut trigger = SlowTrigger::default();
        let mut runner = TriggerRunner::new(TokioTriggerRuntime::default());
        let started = Instant::now();

        let event = runner
            .run_with_timeout(&mut trigger, Duration::from_secs(45))
            .await;

        assert_eq!(event, Some(TriggerEvent::error(TRIGGER_TIMEOUT_MESSAGE)));
        assert_eq!(trigger.polls, 2);
        assert!(trigger.cleaned_up);
        assert_eq!(started.elapsed(), Duration::from_secs(45));
    }
}
