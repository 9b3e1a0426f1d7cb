//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! Client → axum router (timeout, request-id, trace layers)
//!     → gateway_handler: client key + buffered body
//!     → TrafficController.handle
//!     → response, or error taxonomy mapped to a status code
//!
//! Operators → /admin/status, /admin/breakers (JSON introspection)
//! ```

pub mod admin;
pub mod server;

pub use server::HttpServer;
