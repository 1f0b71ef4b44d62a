//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each endpoint (caller-supplied HealthCheck)
//!     → Hysteresis streaks on the endpoint arena
//!     → Suspend indefinitely / clear suspension
//! ```
//!
//! # Design Decisions
//! - Runs independently of request traffic
//! - State transitions require consecutive healthy/unhealthy results
//! - Shares the suspension deadline with the failure-rate breaker;
//!   last write wins
//! - Only the monitor can clear a suspension early

pub mod active;

pub use active::{HealthCheck, HealthMonitor, ProbeFuture};
