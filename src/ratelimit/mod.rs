//! Rate limiting subsystem.
//!
//! # Design Decisions
//! - Fixed window per client key; rejection is immediate and stateless
//!   beyond the counter
//! - Check-then-act is atomic per key (shard entry held across it)
//! - No background timers: idle eviction is an explicit `sweep(now)`
//!   driven by an external scheduler

pub mod window;

pub use window::FixedWindowLimiter;
