//! Route selection subsystem.
//!
//! # Data Flow
//! ```text
//! Request matched → candidate routes (same matching key)
//!     → Apply selection strategy:
//!         - weighted.rs (draw proportional to route weight)
//!         - round_robin.rs (rotate through candidates)
//!     → Return selected route or NoRouteAvailable
//! ```
//!
//! # Design Decisions
//! - Selectors are stateless or carry only a cursor; routes own their
//!   weights
//! - Disabled routes are excluded inside the selector, so every caller
//!   gets the same filtering
//! - Selection is independent of breaker state; the controller decides
//!   what to do when a selected route's circuit is open

use std::sync::Arc;

use crate::error::Error;
use crate::routing::Route;

pub mod round_robin;
pub mod weighted;

pub use round_robin::RoundRobin;
pub use weighted::Weighted;

/// Strategy for choosing one route among candidates sharing a matching
/// key.
pub trait RouteSelector: Send + Sync + std::fmt::Debug {
    /// Pick one enabled route. Fails with [`Error::NoRouteAvailable`]
    /// when no candidate is enabled.
    fn pick(&self, routes: &[Arc<Route>]) -> Result<Arc<Route>, Error>;
}
