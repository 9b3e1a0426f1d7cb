//! Structured logging initialization.
//!
//! Uses the tracing crate throughout; the filter honors `RUST_LOG` when
//! set and falls back to the configured level otherwise.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ObservabilityConfig;

/// Initialize the global tracing subscriber. Call once at startup.
pub fn init_logging(config: &ObservabilityConfig) {
    let fallback = format!(
        "traffic_controller={},tower_http=info",
        config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&fallback)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
