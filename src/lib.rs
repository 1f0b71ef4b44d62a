//! Client-side endpoint load balancer.
//!
//! Wraps asynchronous calls to a fixed set of interchangeable endpoints with
//! endpoint selection, bounded retry, failure-rate suspension and optional
//! active health monitoring.

pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use cache::AsyncCache;
pub use config::{BalancerConfig, FailureRateConfig, MonitorConfig, PolicyKind};
pub use error::{BalancerError, BuildError, ProbeError};
pub use health::HealthCheck;
pub use lifecycle::Shutdown;
pub use load_balancer::{EndpointSnapshot, LoadBalancer};
