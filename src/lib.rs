//! Per-Route Traffic Controller Library
//!
//! Admission control, weighted route selection, and per-route circuit
//! breaking for HTTP gateways, composed by [`controller::TrafficController`].

pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod invoker;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod ratelimit;
pub mod resilience;
pub mod routing;

pub use config::GatewayConfig;
pub use controller::TrafficController;
pub use error::Error;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
