//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → table.rs (candidate lookup)
//!     → matcher.rs (evaluate compiled match conditions)
//!     → Return: all matching routes (selection happens downstream)
//!
//! Registration:
//!     RouteConfig / Route
//!     → compile matchers (method + path prefix)
//!     → insert into RouteTable under a fresh RouteId
//! ```
//!
//! # Design Decisions
//! - Routes are immutable values; mutation is remove + re-register
//! - No regex in the hot path (prefix matching only)
//! - Candidates sharing a matching key are returned together so the
//!   selector can weigh them against each other

pub mod matcher;
pub mod route;
pub mod table;

pub use route::{Route, RouteId, RouteTarget};
pub use table::RouteTable;
