//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): total requests by method, status, path
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_events_total` (counter): controller events (rate limits,
//!   selections, breaker transitions) by event name and labels
//!
//! # Design Decisions
//! - The controller emits through the [`MetricsSink`] trait, never through
//!   the global recorder directly, so tests can observe events without a
//!   Prometheus exporter

use std::net::SocketAddr;
use std::sync::Mutex;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Fire-and-forget event emission consumed by the traffic controller.
pub trait MetricsSink: Send + Sync {
    fn record(&self, event: &'static str, labels: &[(&'static str, String)]);
}

/// Sink forwarding events to the global `metrics` recorder.
#[derive(Debug, Default)]
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn record(&self, event: &'static str, labels: &[(&'static str, String)]) {
        metrics::counter!(event, labels).increment(1);
    }
}

/// Sink that drops every event.
#[derive(Debug, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _event: &'static str, _labels: &[(&'static str, String)]) {}
}

/// Sink that stores events in memory for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in emission order.
    pub fn events(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.events.lock().expect("recording sink mutex poisoned").clone()
    }

    /// Number of events recorded under `event`.
    pub fn count(&self, event: &str) -> usize {
        self.events
            .lock()
            .expect("recording sink mutex poisoned")
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: &'static str, labels: &[(&'static str, String)]) {
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.events
            .lock()
            .expect("recording sink mutex poisoned")
            .push((event.to_string(), labels));
    }
}

/// Install the Prometheus exporter with an HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus exporter"),
    }
}

/// Record a completed request on the server surface.
pub fn record_request(method: &str, status: u16, path: &str, start: std::time::Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("path", path.to_string()),
    ];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}
