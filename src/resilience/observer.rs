//! Policy event hooks.
//!
//! Observers are called synchronously on the task that caused the event,
//! after any breaker lock has been released. They must not panic.

use std::time::Duration;

use crate::observability::metrics;
use crate::resilience::outcome::HandledFailure;

/// Receives retry and breaker transition events.
pub trait PolicyObserver: Send + Sync {
    /// A handled failure is about to be retried after `delay`.
    fn on_retry(&self, _attempt: u32, _delay: Duration, _failure: &HandledFailure) {}

    /// The circuit opened. `failure` is `None` for a manual isolate.
    fn on_break(&self, _failure: Option<&HandledFailure>, _break_duration: Duration) {}

    /// The break elapsed and a trial call is being let through.
    fn on_half_open(&self) {}

    /// The circuit closed again.
    fn on_reset(&self) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PolicyObserver for NoopObserver {}

/// Logs events and records them as metrics, labelled by dependency name.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    dependency: String,
}

impl LoggingObserver {
    pub fn new(dependency: impl Into<String>) -> Self {
        Self {
            dependency: dependency.into(),
        }
    }
}

impl PolicyObserver for LoggingObserver {
    fn on_retry(&self, attempt: u32, delay: Duration, failure: &HandledFailure) {
        tracing::warn!(
            dependency = %self.dependency,
            attempt,
            delay_secs = delay.as_secs_f64(),
            reason = %failure.kind,
            "Retrying request"
        );
        metrics::record_retry(&self.dependency, failure.kind.as_str());
    }

    fn on_break(&self, failure: Option<&HandledFailure>, break_duration: Duration) {
        match failure {
            Some(failure) => tracing::error!(
                dependency = %self.dependency,
                break_secs = break_duration.as_secs_f64(),
                reason = %failure,
                "Circuit breaker opened"
            ),
            None => tracing::warn!(dependency = %self.dependency, "Circuit breaker isolated"),
        }
        metrics::record_breaker_transition(&self.dependency, "open");
    }

    fn on_half_open(&self) {
        tracing::info!(dependency = %self.dependency, "Circuit breaker half-open, sending trial request");
        metrics::record_breaker_transition(&self.dependency, "half_open");
    }

    fn on_reset(&self) {
        tracing::info!(dependency = %self.dependency, "Circuit breaker reset");
        metrics::record_breaker_transition(&self.dependency, "closed");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Event {
        Retry { attempt: u32, delay: Duration },
        Break,
        HalfOpen,
        Reset,
    }

    /// Keeps every event for later assertions.
    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        pub fn count(&self, wanted: &Event) -> usize {
            self.events().iter().filter(|e| *e == wanted).count()
        }
    }

    impl PolicyObserver for RecordingObserver {
        fn on_retry(&self, attempt: u32, delay: Duration, _failure: &HandledFailure) {
            self.events.lock().unwrap().push(Event::Retry { attempt, delay });
        }

        fn on_break(&self, _failure: Option<&HandledFailure>, _break_duration: Duration) {
            self.events.lock().unwrap().push(Event::Break);
        }

        fn on_half_open(&self) {
            self.events.lock().unwrap().push(Event::HalfOpen);
        }

        fn on_reset(&self) {
            self.events.lock().unwrap().push(Event::Reset);
        }
    }
}
