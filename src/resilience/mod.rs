//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Product fetch:
//!     → pipeline.rs (chosen policy around the transport)
//!     → outcome.rs (classify transport result)
//!     → retries.rs (fixed or exponential delay, bounded attempts)
//!       or circuit_breaker.rs (fail fast while the dependency is down)
//!     → observer.rs (log + metrics on retry / break / half-open / reset)
//! ```
//!
//! # Design Decisions
//! - One breaker per downstream dependency, shared across requests
//! - Retry sleeps are per task, never a global pause
//! - 404 counts as a failure by default (configurable)
//! - Unhandled failures bypass every policy

pub mod backoff;
pub mod circuit_breaker;
pub mod observer;
pub mod outcome;
pub mod pipeline;
pub mod retries;
pub mod window;

pub use circuit_breaker::{BreakerSnapshot, BreakerState, CircuitBreaker};
pub use observer::{LoggingObserver, NoopObserver, PolicyObserver};
pub use outcome::{FailureKind, HandledFailure, Outcome, OutcomeClassifier};
pub use pipeline::{Pipeline, PolicyChoice};
pub use retries::RetryPolicy;
