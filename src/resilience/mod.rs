//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! TrafficController
//!     → circuit_breaker.rs (admit, race against deadline, record outcome)
//!     → retries.rs (is this failure retryable?)
//!     → backoff.rs (how long to wait before the next attempt)
//! ```
//!
//! # Design Decisions
//! - One breaker per route, created lazily, destroyed with the route
//! - Fail fast in Open state; single probe in Half-Open
//! - Jittered backoff prevents synchronized retry storms
//! - Retry sequences stop as soon as the breaker stops admitting calls

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
