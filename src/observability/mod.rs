//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Balancer, breaker and health monitor produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID is attached to every per-attempt event
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
