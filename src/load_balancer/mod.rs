//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! LoadBalancer::wrap* (balancer.rs)
//!     → Apply selection policy over the endpoint arena (endpoint.rs):
//!         - round_robin.rs (rotate a shared cursor, skip suspended)
//!         - latency.rs (lowest last latency among eligible)
//!     → Invoke the caller's operation with the chosen index
//!     → Record outcome, retry or return
//! ```
//!
//! # Design Decisions
//! - Endpoints are indices into a fixed arena; there is no endpoint object
//! - Policies are stateless apart from the round-robin cursor
//! - Suspended endpoints excluded from selection
//! - No locks: every endpoint field is its own atomic

pub mod balancer;
pub mod clock;
pub mod endpoint;
pub mod latency;
pub mod round_robin;

use std::time::Duration;

use crate::load_balancer::endpoint::{EndpointArena, EndpointState};

pub use balancer::LoadBalancer;
pub use clock::{Clock, ManualClock, SystemClock};
pub use endpoint::EndpointSnapshot;
pub use latency::LatencyBiased;
pub use round_robin::RoundRobin;

/// Endpoint selection strategy.
pub trait SelectionPolicy: Send + Sync {
    /// Pick an endpoint eligible at `now`, or `None` if all are suspended.
    fn select(&self, endpoints: &EndpointArena, now: u64) -> Option<usize>;

    /// Called after a successful attempt against `endpoint`.
    fn on_success(&self, _endpoint: &EndpointState, _elapsed: Duration) {}

    /// Called after a failed attempt against `endpoint`.
    fn on_failure(&self, _endpoint: &EndpointState) {}
}
