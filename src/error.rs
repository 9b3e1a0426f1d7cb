//! Error taxonomy for the traffic controller.
//!
//! Every request-time failure the controller can produce is one of these
//! kinds. The gateway layer maps each kind to an HTTP status via
//! [`Error::status`]; the controller itself never touches status codes.

use std::time::Duration;

use axum::http::{Method, StatusCode};

use crate::routing::RouteId;

/// Boxed error type for opaque invoker failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request-time and construction-time errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Client exceeded its request budget for the current window.
    #[error("rate limit exceeded for client {client}")]
    RateLimited { client: String },

    /// No registered route matches the request method and path.
    #[error("no route matches {method} {path}")]
    RouteNotFound { method: Method, path: String },

    /// Matching routes exist but every candidate is disabled.
    #[error("no enabled route available")]
    NoRouteAvailable,

    /// The selected route's circuit is open; the backend was not called.
    #[error("circuit open for route {route}")]
    CircuitOpen { route: RouteId },

    /// The backend call exceeded the per-call deadline. Counts as a
    /// breaker failure.
    #[error("route {route} timed out after {deadline:?}")]
    Timeout { route: RouteId, deadline: Duration },

    /// The backend call itself failed. Counts as a breaker failure.
    #[error("upstream error on route {route}: {source}")]
    Upstream {
        route: RouteId,
        #[source]
        source: BoxError,
    },

    /// Invalid parameters detected at construction time. Fatal; never
    /// produced while serving requests.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::RateLimited { .. } => "rate_limited",
            Error::RouteNotFound { .. } => "route_not_found",
            Error::NoRouteAvailable => "no_route_available",
            Error::CircuitOpen { .. } => "circuit_open",
            Error::Timeout { .. } => "timeout",
            Error::Upstream { .. } => "upstream",
            Error::Configuration(_) => "configuration",
        }
    }

    /// HTTP-equivalent status for this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Error::NoRouteAvailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
