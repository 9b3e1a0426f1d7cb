//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML config
//! files. Every section has defaults so a minimal config is valid.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, backpressure).
    pub listener: ListenerConfig,

    /// Route definitions registered at startup.
    pub routes: Vec<RouteConfig>,

    /// Per-client admission control.
    pub rate_limit: RateLimitConfig,

    /// Per-route circuit breaker settings.
    pub breaker: BreakerConfig,

    /// Retry policy for failed backend calls.
    pub retries: RetryConfig,

    /// Route selection strategy.
    pub selection: SelectionConfig,

    /// Timeout configuration for the server surface.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Route configuration: a matching key plus a backend target.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route name for logging/metrics.
    pub name: String,

    /// HTTP method to match (e.g., "GET").
    pub method: String,

    /// Path prefix to match.
    pub path_prefix: String,

    /// Backend target this route forwards to.
    pub target: TargetConfig,

    /// Weight for weighted selection among routes sharing a matching key
    /// (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// Disabled routes are excluded from selection.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Backend target address parts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// URL scheme (default: "http").
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Backend host.
    pub host: String,

    /// Backend port.
    pub port: u16,

    /// Endpoint path prefix prepended to the forwarded request path.
    #[serde(default)]
    pub endpoint: String,
}

fn default_weight() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

fn default_scheme() -> String {
    "http".to_string()
}

/// Per-client fixed-window rate limiting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client per window.
    pub max_requests: u32,

    /// Window length in milliseconds. Must be positive.
    pub window_ms: u64,

    /// Interval between idle-entry sweeps, in seconds.
    pub sweep_interval_secs: u64,

    /// Entries idle for this many windows are evicted by a sweep.
    pub idle_windows: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_ms: 1_000,
            sweep_interval_secs: 30,
            idle_windows: 4,
        }
    }
}

/// Per-route circuit breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Time the circuit stays open before a recovery trial is allowed,
    /// in milliseconds.
    pub recovery_timeout_ms: u64,

    /// Per-call deadline for backend invocations, in milliseconds.
    pub call_timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_ms: 30_000,
            call_timeout_ms: 10_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts per request (first try included).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

/// Route selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Weight-proportional random selection.
    Weighted,
    /// Rotate through candidates in order.
    RoundRobin,
}

/// Selection policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Which selector to use among candidate routes.
    pub strategy: SelectionStrategy,

    /// When the selected route's circuit is open, reselect among the
    /// remaining candidates instead of failing the request.
    pub reselect_on_open: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::Weighted,
            reselect_on_open: false,
        }
    }
}

/// Timeout configuration for the server surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request/response deadline enforced by the server, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
