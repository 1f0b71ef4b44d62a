//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Logical request:
//!     → retries.rs (request id, retry budget per attempt)
//!     → attempt fails → circuit_breaker.rs (failure window, suspend on overflow)
//!     → budget left → next attempt, otherwise surface the original error
//! ```
//!
//! # Design Decisions
//! - Retries are immediate; there is no backoff
//! - No per-attempt timeout: an operation that never settles stalls its request
//! - Circuit breaker state lives in the endpoint arena, not here

pub mod circuit_breaker;
pub mod retries;

pub use circuit_breaker::FailureWindow;
pub use retries::{RequestGuard, RequestId, RetryTracker};
