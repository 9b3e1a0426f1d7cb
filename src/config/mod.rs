//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → consumed by TrafficController and server construction
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Semantic violations are construction-time failures; nothing invalid
//!   reaches request handling

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BreakerConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    RetryConfig, RouteConfig, SelectionConfig, SelectionStrategy, TargetConfig, TimeoutConfig,
};
