//! Lifecycle subsystem.
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown signal out to every
//!   long-running task; tasks `select!` on it next to their work
//! - Signal handling is opt-in (`trigger_on_ctrl_c`) so tests and
//!   embedders trigger shutdown programmatically

pub mod shutdown;

pub use shutdown::Shutdown;
