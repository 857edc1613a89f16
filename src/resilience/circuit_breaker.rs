//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, outcomes are recorded
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: one trial call tests whether the dependency recovered
//! - Isolated: held open manually until reset
//!
//! # State Transitions
//! ```text
//! Closed → Open: trip condition met after a handled failure
//! Open → Half-Open: first call after the break duration
//! Half-Open → Closed: trial call succeeds (samples reset)
//! Half-Open → Open: trial call fails (break timer restarts)
//! any → Isolated: isolate(); Isolated/any → Closed: reset()
//! ```
//!
//! Two trip conditions share the state machine: N consecutive handled
//! failures, or a failure ratio over a rolling window once a minimum number
//! of calls has been sampled.
//!
//! All transitions happen under one mutex that is never held across an
//! await. Every transition bumps a generation counter; a call only reports
//! its outcome if the breaker is still in the generation that admitted it.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::{AdvancedCircuitBreakerConfig, CircuitBreakerConfig};
use crate::resilience::observer::PolicyObserver;
use crate::resilience::outcome::{HandledFailure, Outcome};
use crate::resilience::window::{SampleWindow, WindowCounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
    Isolated,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
            BreakerState::Isolated => "isolated",
        }
    }
}

#[derive(Debug)]
enum TripCondition {
    ConsecutiveFailures {
        threshold: u32,
        count: u32,
    },
    FailureRate {
        threshold: f64,
        minimum_throughput: u32,
        window: SampleWindow,
    },
}

impl TripCondition {
    fn on_success(&mut self, now: Instant) {
        match self {
            TripCondition::ConsecutiveFailures { count, .. } => *count = 0,
            TripCondition::FailureRate { window, .. } => window.record_success(now),
        }
    }

    /// Record a handled failure; true when the circuit should open.
    fn on_failure(&mut self, now: Instant) -> bool {
        match self {
            TripCondition::ConsecutiveFailures { threshold, count } => {
                *count += 1;
                *count >= *threshold
            }
            TripCondition::FailureRate {
                threshold,
                minimum_throughput,
                window,
            } => {
                window.record_failure(now);
                let counts = window.counts(now);
                counts.total >= *minimum_throughput && counts.failure_rate() >= *threshold
            }
        }
    }

    fn counts(&mut self, now: Instant) -> WindowCounts {
        match self {
            TripCondition::ConsecutiveFailures { count, .. } => WindowCounts {
                failures: *count,
                total: *count,
            },
            TripCondition::FailureRate { window, .. } => window.counts(now),
        }
    }

    fn reset(&mut self) {
        match self {
            TripCondition::ConsecutiveFailures { count, .. } => *count = 0,
            TripCondition::FailureRate { window, .. } => window.reset(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    trip: TripCondition,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    generation: u64,
}

impl Inner {
    fn is_current(&self, state: BreakerState, generation: u64) -> bool {
        self.state == state && self.generation == generation
    }

    fn transition(&mut self, state: BreakerState) {
        self.state = state;
        self.generation += 1;
        self.trial_in_flight = false;
    }

    fn open(&mut self, now: Instant) {
        self.transition(BreakerState::Open);
        self.opened_at = Some(now);
    }

    fn close(&mut self) {
        self.transition(BreakerState::Closed);
        self.opened_at = None;
        self.trip.reset();
    }

    fn remaining_break(&self, now: Instant, break_duration: Duration) -> Duration {
        match self.opened_at {
            Some(opened_at) => break_duration.saturating_sub(now.duration_since(opened_at)),
            None => Duration::ZERO,
        }
    }
}

/// What the observer is told once the lock is released.
enum Transition {
    Break(Option<HandledFailure>, Duration),
    HalfOpen,
    Reset,
}

#[derive(Debug, Clone, Copy)]
enum Ticket {
    Closed { generation: u64 },
    Trial { generation: u64 },
}

/// Admission for one call. Dropping an unsettled trial frees the slot.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    ticket: Ticket,
    settled: bool,
}

impl CallPermit<'_> {
    fn settle(mut self, outcome: &Outcome) {
        self.settled = true;
        self.breaker.record(self.ticket, outcome);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if let (false, Ticket::Trial { generation }) = (self.settled, self.ticket) {
            tracing::debug!(breaker = %self.breaker.name, "Trial call abandoned");
            self.breaker.release_trial(generation);
        }
    }
}

/// Point-in-time view of a breaker, for the admin API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: BreakerState,
    pub failures: u32,
    pub total: u32,
    pub failure_rate: f64,
    /// Milliseconds until a trial call is allowed, while open.
    pub open_remaining_ms: Option<u64>,
}

pub struct CircuitBreaker {
    name: String,
    break_duration: Duration,
    inner: Mutex<Inner>,
    observer: Arc<dyn PolicyObserver>,
}

impl CircuitBreaker {
    fn with_trip(
        name: impl Into<String>,
        trip: TripCondition,
        break_duration: Duration,
        observer: Arc<dyn PolicyObserver>,
    ) -> Self {
        Self {
            name: name.into(),
            break_duration,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                trip,
                opened_at: None,
                trial_in_flight: false,
                generation: 0,
            }),
            observer,
        }
    }

    /// Opens after `handled_events_allowed_before_breaking` consecutive
    /// handled failures.
    pub fn consecutive(
        name: impl Into<String>,
        config: &CircuitBreakerConfig,
        observer: Arc<dyn PolicyObserver>,
    ) -> Self {
        let trip = TripCondition::ConsecutiveFailures {
            threshold: config.handled_events_allowed_before_breaking.max(1),
            count: 0,
        };
        Self::with_trip(name, trip, config.break_duration(), observer)
    }

    /// Opens when the failure ratio over the sampling window reaches the
    /// threshold with at least `minimum_throughput` samples.
    pub fn advanced(
        name: impl Into<String>,
        config: &AdvancedCircuitBreakerConfig,
        observer: Arc<dyn PolicyObserver>,
    ) -> Self {
        let trip = TripCondition::FailureRate {
            threshold: config.failure_threshold,
            minimum_throughput: config.minimum_throughput,
            window: SampleWindow::new(config.sampling_duration()),
        };
        Self::with_trip(name, trip, config.break_duration(), observer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn break_duration(&self) -> Duration {
        self.break_duration
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }

    /// Run `op` through the breaker. Rejected calls never invoke `op`.
    pub async fn execute<F, Fut>(&self, op: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let permit = match self.admit() {
            Ok(permit) => permit,
            Err(rejection) => return Outcome::Handled(rejection),
        };
        let outcome = op().await;
        permit.settle(&outcome);
        outcome
    }

    fn admit(&self) -> Result<CallPermit<'_>, HandledFailure> {
        let now = Instant::now();
        let (ticket, event) = {
            let mut inner = self.lock();
            match inner.state {
                BreakerState::Closed => (
                    Ticket::Closed {
                        generation: inner.generation,
                    },
                    None,
                ),
                BreakerState::Open => {
                    let remaining = inner.remaining_break(now, self.break_duration);
                    if !remaining.is_zero() {
                        return Err(HandledFailure::circuit_open(remaining));
                    }
                    inner.transition(BreakerState::HalfOpen);
                    inner.trial_in_flight = true;
                    (
                        Ticket::Trial {
                            generation: inner.generation,
                        },
                        Some(Transition::HalfOpen),
                    )
                }
                BreakerState::HalfOpen => {
                    if inner.trial_in_flight {
                        return Err(HandledFailure::circuit_open(Duration::ZERO));
                    }
                    inner.trial_in_flight = true;
                    (
                        Ticket::Trial {
                            generation: inner.generation,
                        },
                        None,
                    )
                }
                BreakerState::Isolated => return Err(HandledFailure::isolated()),
            }
        };

        if let Some(event) = event {
            self.notify(event);
        }
        Ok(CallPermit {
            breaker: self,
            ticket,
            settled: false,
        })
    }

    fn record(&self, ticket: Ticket, outcome: &Outcome) {
        let now = Instant::now();
        let event = {
            let mut inner = self.lock();
            match (ticket, outcome) {
                (Ticket::Trial { generation }, Outcome::Unhandled(_)) => {
                    if inner.is_current(BreakerState::HalfOpen, generation) {
                        inner.trial_in_flight = false;
                    }
                    None
                }
                (Ticket::Closed { .. }, Outcome::Unhandled(_)) => None,
                (Ticket::Closed { generation }, Outcome::Success(_)) => {
                    if inner.is_current(BreakerState::Closed, generation) {
                        inner.trip.on_success(now);
                    }
                    None
                }
                (Ticket::Closed { generation }, Outcome::Handled(failure)) => {
                    if inner.is_current(BreakerState::Closed, generation)
                        && inner.trip.on_failure(now)
                    {
                        inner.open(now);
                        Some(Transition::Break(Some(failure.clone()), self.break_duration))
                    } else {
                        None
                    }
                }
                (Ticket::Trial { generation }, Outcome::Success(_)) => {
                    if inner.is_current(BreakerState::HalfOpen, generation) {
                        inner.close();
                        Some(Transition::Reset)
                    } else {
                        None
                    }
                }
                (Ticket::Trial { generation }, Outcome::Handled(failure)) => {
                    if inner.is_current(BreakerState::HalfOpen, generation) {
                        inner.open(now);
                        Some(Transition::Break(Some(failure.clone()), self.break_duration))
                    } else {
                        None
                    }
                }
            }
        };

        if let Some(event) = event {
            self.notify(event);
        }
    }

    fn release_trial(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.is_current(BreakerState::HalfOpen, generation) {
            inner.trial_in_flight = false;
        }
    }

    fn notify(&self, event: Transition) {
        match event {
            Transition::Break(failure, duration) => self.observer.on_break(failure.as_ref(), duration),
            Transition::HalfOpen => self.observer.on_half_open(),
            Transition::Reset => self.observer.on_reset(),
        }
    }

    /// Hold the circuit open until `reset` is called.
    pub fn isolate(&self) {
        {
            let mut inner = self.lock();
            inner.transition(BreakerState::Isolated);
            inner.opened_at = None;
        }
        self.notify(Transition::Break(None, Duration::MAX));
    }

    /// Close the circuit and forget all samples.
    pub fn reset(&self) {
        self.lock().close();
        self.notify(Transition::Reset);
    }

    /// Current state. An open circuit whose break has elapsed reports
    /// half-open, since the next call will be a trial.
    pub fn state(&self) -> BreakerState {
        let now = Instant::now();
        let inner = self.lock();
        Self::effective_state(&inner, now, self.break_duration)
    }

    fn effective_state(inner: &Inner, now: Instant, break_duration: Duration) -> BreakerState {
        if inner.state == BreakerState::Open && inner.remaining_break(now, break_duration).is_zero() {
            BreakerState::HalfOpen
        } else {
            inner.state
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        let mut inner = self.lock();
        let state = Self::effective_state(&inner, now, self.break_duration);
        let counts = inner.trip.counts(now);
        let open_remaining_ms = (state == BreakerState::Open)
            .then(|| inner.remaining_break(now, self.break_duration).as_millis() as u64);

        BreakerSnapshot {
            name: self.name.clone(),
            state,
            failures: counts.failures,
            total: counts.total,
            failure_rate: counts.failure_rate(),
            open_remaining_ms,
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("break_duration", &self.break_duration)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
