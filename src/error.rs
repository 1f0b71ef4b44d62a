//! Errors surfaced by the balancer.

use thiserror::Error;

use crate::config::ConfigError;

/// Outcome of a logical request that did not succeed.
///
/// `Endpoint` carries the operation's own error from the final attempt,
/// untouched, so callers can tell transport or business failures apart from
/// balancer-level ones.
#[derive(Debug, Error)]
pub enum BalancerError<E> {
    /// The final attempt failed with this error.
    #[error(transparent)]
    Endpoint(E),

    /// Every endpoint was suspended when an attempt started.
    #[error("All backends suspended")]
    BackendsExhausted,
}

impl<E> BalancerError<E> {
    /// Return the endpoint error, if this is one.
    pub fn into_endpoint(self) -> Option<E> {
        match self {
            BalancerError::Endpoint(e) => Some(e),
            BalancerError::BackendsExhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, BalancerError::BackendsExhausted)
    }
}

/// A health probe that could not produce a verdict.
///
/// Counted as an unhealthy result; never returned to callers.
#[derive(Debug, Clone, Error)]
#[error("Health probe failed: {0}")]
pub struct ProbeError(pub String);

impl ProbeError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

/// Failure to construct a balancer.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A health monitor was configured outside a Tokio runtime.
    #[error("Health monitor requires a Tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
