//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by status
//! - `gateway_request_duration_seconds` (histogram): inbound latency
//! - `gateway_retries_total` (counter): retries by dependency and reason
//! - `gateway_breaker_transitions_total` (counter): breaker transitions
//! - `gateway_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("gateway_requests_total", "status" => status.to_string()).increment(1);
    histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_retry(dependency: &str, reason: &'static str) {
    counter!(
        "gateway_retries_total",
        "dependency" => dependency.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_breaker_transition(dependency: &str, state: &'static str) {
    counter!(
        "gateway_breaker_transitions_total",
        "dependency" => dependency.to_string(),
        "to" => state
    )
    .increment(1);

    let value = match state {
        "closed" => 0.0,
        "half_open" => 1.0,
        _ => 2.0,
    };
    gauge!("gateway_breaker_state", "dependency" => dependency.to_string()).set(value);
}
