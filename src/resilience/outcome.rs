//! Outcome classification.
//!
//! Decides which transport results the policies react to. Network faults
//! and 5xx responses are handled failures; so is any status listed in
//! `treat_as_failure` (404 by default, meaning a missing product is retried
//! and counted against the breaker rather than returned as an empty result).

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;

use crate::client::transport::{TransportError, TransportResponse, TransportResult};

/// Why a call counts as failed for policy purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, timeout, TLS or other network fault.
    Transient,
    /// 5xx response.
    ServerError,
    /// A non-5xx status configured to count as failure.
    TreatedAsFailure,
    /// Rejected locally because the circuit is open.
    CircuitOpen,
    /// Rejected locally because the circuit was manually isolated.
    Isolated,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transient => "transient",
            FailureKind::ServerError => "server-error",
            FailureKind::TreatedAsFailure => "treated-as-failure",
            FailureKind::CircuitOpen => "circuit-open",
            FailureKind::Isolated => "isolated",
        }
    }

    /// Whether the failure was produced without touching the network.
    pub fn is_fast_fail(&self) -> bool {
        matches!(self, FailureKind::CircuitOpen | FailureKind::Isolated)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure the policies react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledFailure {
    pub kind: FailureKind,
    /// Response status, when the downstream answered.
    pub status: Option<StatusCode>,
    pub detail: String,
    /// How long until the circuit may admit calls again.
    pub retry_after: Option<Duration>,
}

impl HandledFailure {
    pub fn transient(err: &TransportError) -> Self {
        Self {
            kind: FailureKind::Transient,
            status: None,
            detail: err.to_string(),
            retry_after: None,
        }
    }

    pub fn from_status(kind: FailureKind, status: StatusCode) -> Self {
        Self {
            kind,
            status: Some(status),
            detail: format!("downstream responded {}", status),
            retry_after: None,
        }
    }

    pub fn circuit_open(retry_after: Duration) -> Self {
        Self {
            kind: FailureKind::CircuitOpen,
            status: None,
            detail: "circuit is open".to_string(),
            retry_after: Some(retry_after),
        }
    }

    pub fn isolated() -> Self {
        Self {
            kind: FailureKind::Isolated,
            status: None,
            detail: "circuit is isolated".to_string(),
            retry_after: None,
        }
    }
}

impl fmt::Display for HandledFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Result of one call as seen by the policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(TransportResponse),
    Handled(HandledFailure),
    Unhandled(TransportError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn handled(&self) -> Option<&HandledFailure> {
        match self {
            Outcome::Handled(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Maps transport results to outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeClassifier {
    treat_as_failure: Vec<StatusCode>,
}

impl OutcomeClassifier {
    /// Statuses outside 100..=999 are ignored; config validation rejects them.
    pub fn new(treat_as_failure: &[u16]) -> Self {
        Self {
            treat_as_failure: treat_as_failure
                .iter()
                .filter_map(|code| StatusCode::from_u16(*code).ok())
                .collect(),
        }
    }

    pub fn classify(&self, result: TransportResult) -> Outcome {
        match result {
            Ok(response) => {
                let status = response.status;
                if status.is_server_error() {
                    Outcome::Handled(HandledFailure::from_status(FailureKind::ServerError, status))
                } else if self.treat_as_failure.contains(&status) {
                    Outcome::Handled(HandledFailure::from_status(
                        FailureKind::TreatedAsFailure,
                        status,
                    ))
                } else {
                    Outcome::Success(response)
                }
            }
            Err(err) if err.is_transient() => Outcome::Handled(HandledFailure::transient(&err)),
            Err(err) => Outcome::Unhandled(err),
        }
    }
}

impl Default for OutcomeClassifier {
    fn default() -> Self {
        Self::new(&[404])
    }
}
