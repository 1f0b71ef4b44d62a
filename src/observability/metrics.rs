//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balancer_attempts_total` (counter): attempts by endpoint, outcome
//! - `balancer_exhausted_total` (counter): requests rejected with every endpoint suspended
//! - `balancer_suspensions_total` (counter): suspensions by endpoint, reason
//! - `balancer_endpoint_health` (gauge): 1=healthy, 0=unhealthy
//! - `balancer_latency_ms` (histogram): successful attempt latency
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt(endpoint: usize, outcome: &'static str) {
    counter!(
        "balancer_attempts_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_latency(endpoint: usize, elapsed: Duration) {
    histogram!("balancer_latency_ms", "endpoint" => endpoint.to_string())
        .record(elapsed.as_secs_f64() * 1000.0);
}

pub fn record_exhausted() {
    counter!("balancer_exhausted_total").increment(1);
}

pub fn record_suspension(endpoint: usize, reason: &'static str) {
    counter!(
        "balancer_suspensions_total",
        "endpoint" => endpoint.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_endpoint_health(endpoint: usize, healthy: bool) {
    gauge!("balancer_endpoint_health", "endpoint" => endpoint.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
