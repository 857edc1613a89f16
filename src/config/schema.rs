//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::backoff::BackoffKind;
use crate::resilience::pipeline::PolicyChoice;

/// Root configuration for ServiceA.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The product service this gateway depends on.
    pub downstream: DownstreamConfig,

    /// Policy engine applied to outbound calls.
    pub resilience: ResilienceConfig,

    /// Inbound timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Downstream (ServiceB) connection settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Base address that product ids are joined onto. Must end with `/`.
    pub base_url: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Per-attempt request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Honour system proxy environment variables.
    pub use_proxy: bool,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7192/api/products/".to_string(),
            connect_timeout_ms: 2_000,
            request_timeout_ms: 5_000,
            use_proxy: false,
        }
    }
}

/// Resilience policy configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Which policy wraps the outbound call.
    pub policy: PolicyChoice,

    /// Non-5xx status codes that still count as handled failures.
    pub treat_as_failure: Vec<u16>,

    pub retry: RetryConfig,

    pub circuit_breaker: CircuitBreakerConfig,

    pub advanced_circuit_breaker: AdvancedCircuitBreakerConfig,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            policy: PolicyChoice::default(),
            treat_as_failure: vec![404],
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            advanced_circuit_breaker: AdvancedCircuitBreakerConfig::default(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial call.
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds (base delay for exponential).
    pub delay_ms: u64,

    /// Fixed or exponential spacing of attempts.
    pub backoff: BackoffKind,

    /// Upper bound for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Longest the retry schedule can sleep in total.
    pub fn worst_case_delay(&self) -> Duration {
        let per_attempt = match self.backoff {
            BackoffKind::Fixed => self.delay_ms,
            // Jitter adds up to 10% on top of the cap.
            BackoffKind::Exponential => self.max_delay_ms + self.max_delay_ms / 10,
        };
        Duration::from_millis(per_attempt.saturating_mul(self.max_attempts as u64))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 10_000,
            backoff: BackoffKind::Fixed,
            max_delay_ms: 60_000,
        }
    }
}

/// Consecutive-failure circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive handled failures that open the circuit.
    pub handled_events_allowed_before_breaking: u32,

    /// Time the circuit stays open, in milliseconds.
    pub break_duration_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn break_duration(&self) -> Duration {
        Duration::from_millis(self.break_duration_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            handled_events_allowed_before_breaking: 3,
            break_duration_ms: 10_000,
        }
    }
}

/// Failure-rate circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdvancedCircuitBreakerConfig {
    /// Failure ratio (0, 1] that opens the circuit.
    pub failure_threshold: f64,

    /// Rolling window used to compute the failure ratio, in milliseconds.
    pub sampling_duration_ms: u64,

    /// Calls required in the window before the ratio is evaluated.
    pub minimum_throughput: u32,

    /// Time the circuit stays open, in milliseconds.
    pub break_duration_ms: u64,
}

impl AdvancedCircuitBreakerConfig {
    pub fn sampling_duration(&self) -> Duration {
        Duration::from_millis(self.sampling_duration_ms)
    }

    pub fn break_duration(&self) -> Duration {
        Duration::from_millis(self.break_duration_ms)
    }
}

impl Default for AdvancedCircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0.1,
            sampling_duration_ms: 30_000,
            minimum_throughput: 3,
            break_duration_ms: 30_000,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        // Long enough for the default retry schedule (5 x 10s) to finish.
        Self { request_secs: 120 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin endpoints.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
