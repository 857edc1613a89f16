//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! constraints. Every problem is reported, not just the first.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;
use crate::resilience::pipeline::PolicyChoice;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("retry schedule ({retry_secs}s of delays) does not fit in the {timeout_secs}s request timeout")]
    RetryExceedsTimeout { retry_secs: u64, timeout_secs: u64 },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(invalid("listener.bind_address", "not a socket address"));
    }

    match Url::parse(&config.downstream.base_url) {
        Ok(url) => {
            if url.cannot_be_a_base() {
                errors.push(invalid("downstream.base_url", "cannot be used as a base"));
            } else if !url.path().ends_with('/') {
                errors.push(invalid("downstream.base_url", "must end with '/'"));
            }
        }
        Err(e) => errors.push(invalid("downstream.base_url", e.to_string())),
    }
    if config.downstream.request_timeout_ms == 0 {
        errors.push(invalid("downstream.request_timeout_ms", "must be greater than zero"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(invalid("timeouts.request_secs", "must be greater than zero"));
    }

    let resilience = &config.resilience;
    for status in &resilience.treat_as_failure {
        if !(100..=599).contains(status) {
            errors.push(invalid(
                "resilience.treat_as_failure",
                format!("{} is not an HTTP status code", status),
            ));
        }
    }

    let retry = &resilience.retry;
    if retry.max_delay_ms < retry.delay_ms {
        errors.push(invalid("resilience.retry.max_delay_ms", "must be at least delay_ms"));
    }
    if resilience.policy == PolicyChoice::Retry {
        let budget = Duration::from_secs(config.timeouts.request_secs);
        if retry.worst_case_delay() >= budget {
            errors.push(ValidationError::RetryExceedsTimeout {
                retry_secs: retry.worst_case_delay().as_secs(),
                timeout_secs: config.timeouts.request_secs,
            });
        }
    }

    let cb = &resilience.circuit_breaker;
    if cb.handled_events_allowed_before_breaking == 0 {
        errors.push(invalid(
            "resilience.circuit_breaker.handled_events_allowed_before_breaking",
            "must be greater than zero",
        ));
    }
    if cb.break_duration_ms == 0 {
        errors.push(invalid("resilience.circuit_breaker.break_duration_ms", "must be greater than zero"));
    }

    let acb = &resilience.advanced_circuit_breaker;
    if !(acb.failure_threshold > 0.0 && acb.failure_threshold <= 1.0) {
        errors.push(invalid(
            "resilience.advanced_circuit_breaker.failure_threshold",
            "must be in (0, 1]",
        ));
    }
    if acb.sampling_duration_ms < 20 {
        errors.push(invalid(
            "resilience.advanced_circuit_breaker.sampling_duration_ms",
            "must be at least 20ms",
        ));
    }
    if acb.minimum_throughput < 2 {
        errors.push(invalid(
            "resilience.advanced_circuit_breaker.minimum_throughput",
            "must be at least 2",
        ));
    }
    if acb.break_duration_ms == 0 {
        errors.push(invalid(
            "resilience.advanced_circuit_breaker.break_duration_ms",
            "must be greater than zero",
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(invalid("admin.api_key", "must not be empty when admin is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = ServiceConfig::default();
        config.downstream.base_url = "http://localhost:7192/api/products".into();
        config.resilience.advanced_circuit_breaker.failure_threshold = 1.5;
        config.resilience.advanced_circuit_breaker.minimum_throughput = 1;
        config.resilience.treat_as_failure = vec![404, 42];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.to_string().contains("must end with '/'")));
        assert!(errors.iter().any(|e| e.to_string().contains("42")));
    }

    #[test]
    fn test_retry_must_fit_request_timeout() {
        let mut config = ServiceConfig::default();
        config.resilience.policy = PolicyChoice::Retry;
        config.timeouts.request_secs = 30;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::RetryExceedsTimeout {
                retry_secs: 50,
                timeout_secs: 30
            }]
        );

        // Breaker policies never sleep, so the same timeout is fine.
        config.resilience.policy = PolicyChoice::CircuitBreaker;
        assert!(validate_config(&config).is_ok());
    }
}
