//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or BalancerConfig literal
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → LoadBalancer::new / LoadBalancer::with_health_check
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the balancer is built; the endpoint set is static
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::BalancerConfig;
pub use schema::FailureRateConfig;
pub use schema::MonitorConfig;
pub use schema::ObservabilityConfig;
pub use schema::PolicyKind;
