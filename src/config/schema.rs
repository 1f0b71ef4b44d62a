//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Number of interchangeable endpoints, addressed as `0..endpoint_count`.
    pub endpoint_count: usize,

    /// Extra attempts after the first failure.
    pub retry_count: u32,

    /// Endpoint selection policy.
    pub policy: PolicyKind,

    /// Failure-rate circuit breaker. Absent means disabled.
    pub failure_rate: Option<FailureRateConfig>,

    /// Active health monitoring. Absent means disabled.
    pub monitor: Option<MonitorConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            endpoint_count: 1,
            retry_count: 0,
            policy: PolicyKind::default(),
            failure_rate: None,
            monitor: None,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl BalancerConfig {
    pub fn with_endpoints(endpoint_count: usize) -> Self {
        Self {
            endpoint_count,
            ..Self::default()
        }
    }
}

/// Selection policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    RoundRobin,
    LatencyBiased,
}

/// Failure-rate circuit breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FailureRateConfig {
    /// Failures inside `window_ms` that suspend an endpoint. 0 disables.
    pub max_failures: usize,

    /// Sliding window length in milliseconds.
    pub window_ms: u64,

    /// How long a tripped endpoint stays suspended, in milliseconds.
    pub suspension_ms: u64,
}

impl FailureRateConfig {
    pub fn new(max_failures: usize, window: Duration, suspension: Duration) -> Self {
        Self {
            max_failures,
            window_ms: window.as_millis() as u64,
            suspension_ms: suspension.as_millis() as u64,
        }
    }
}

/// Active health check settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Delay between probe rounds in milliseconds.
    pub interval_ms: u64,

    /// Number of consecutive failed probes before suspending.
    pub unhealthy_threshold: u32,

    /// Number of consecutive healthy probes before clearing a suspension.
    pub healthy_threshold: u32,
}

impl MonitorConfig {
    pub fn new(interval: Duration, unhealthy_threshold: u32, healthy_threshold: u32) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            unhealthy_threshold,
            healthy_threshold,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
