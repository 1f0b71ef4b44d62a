//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and option
//! combinations. Every problem is reported, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::BalancerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.endpoint_count == 0 {
        errors.push(ValidationError::new(
            "endpoint_count",
            "at least one endpoint is required",
        ));
    }

    if let Some(rate) = &config.failure_rate {
        if rate.max_failures > 0 {
            if rate.window_ms == 0 {
                errors.push(ValidationError::new(
                    "failure_rate.window_ms",
                    "must be greater than zero",
                ));
            }
            if rate.suspension_ms == 0 {
                errors.push(ValidationError::new(
                    "failure_rate.suspension_ms",
                    "must be greater than zero",
                ));
            }
        }
    }

    if let Some(monitor) = &config.monitor {
        if monitor.interval_ms == 0 {
            errors.push(ValidationError::new(
                "monitor.interval_ms",
                "must be greater than zero",
            ));
        }
        if monitor.unhealthy_threshold == 0 {
            errors.push(ValidationError::new(
                "monitor.unhealthy_threshold",
                "must be at least 1",
            ));
        }
        if monitor.healthy_threshold == 0 {
            errors.push(ValidationError::new(
                "monitor.healthy_threshold",
                "must be at least 1",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
