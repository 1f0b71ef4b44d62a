//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Validate config → Allocate endpoint arena → Spawn health monitor
//!
//! Teardown (LoadBalancer::shutdown or drop):
//!     Trigger shutdown → Monitor loop exits → In-flight probes detached
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
