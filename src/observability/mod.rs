//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! TrafficController events → MetricsSink (trait)
//!     → PrometheusSink → metrics recorder → Prometheus scrape endpoint
//!     → RecordingSink (tests)
//! Server surface → record_request (counters + latency histogram)
//! All subsystems → tracing spans/events → fmt subscriber
//! ```
//!
//! # Design Decisions
//! - The controller never logs or exports directly; it emits typed events
//!   through the sink seam
//! - Metric updates are cheap (atomic recorder handles)
//! - Request IDs flow through tower-http layers, not hand-rolled state

pub mod logging;
pub mod metrics;

pub use metrics::{MetricsSink, NoopSink, PrometheusSink, RecordingSink};
