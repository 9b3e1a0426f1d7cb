//! Configuration validation.
//!
//! Serde handles the syntactic layer; this module performs the semantic
//! pass. It is a pure function over the parsed config and returns every
//! violation found, not just the first, so an operator can fix a config
//! file in one round trip. A config that fails here is never accepted
//! into the system.

use axum::http::Method;

use crate::config::schema::GatewayConfig;

/// A single semantic violation in a parsed config.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address {0:?} is not a valid socket address")]
    InvalidMetricsAddress(String),

    #[error("rate_limit.window_ms must be positive")]
    ZeroWindow,

    #[error("breaker.failure_threshold must be positive")]
    ZeroFailureThreshold,

    #[error("breaker.recovery_timeout_ms must be positive")]
    ZeroRecoveryTimeout,

    #[error("breaker.call_timeout_ms must be positive")]
    ZeroCallTimeout,

    #[error("retries.max_attempts must be at least 1")]
    ZeroRetryAttempts,

    #[error("route {0:?} has an empty name")]
    EmptyRouteName(String),

    #[error("duplicate route name {0:?}")]
    DuplicateRouteName(String),

    #[error("route {route:?}: unknown HTTP method {method:?}")]
    InvalidMethod { route: String, method: String },

    #[error("route {0:?}: path_prefix must start with '/'")]
    InvalidPathPrefix(String),

    #[error("route {0:?}: target host is empty")]
    EmptyTargetHost(String),
}

/// Validate a parsed config, collecting all violations.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold);
    }
    if config.breaker.recovery_timeout_ms == 0 {
        errors.push(ValidationError::ZeroRecoveryTimeout);
    }
    if config.breaker.call_timeout_ms == 0 {
        errors.push(ValidationError::ZeroCallTimeout);
    }
    if config.retries.enabled && config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroRetryAttempts);
    }

    let mut seen_names = std::collections::HashSet::new();
    for route in &config.routes {
        if route.name.is_empty() {
            errors.push(ValidationError::EmptyRouteName(route.path_prefix.clone()));
        } else if !seen_names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRouteName(route.name.clone()));
        }

        if Method::from_bytes(route.method.to_uppercase().as_bytes()).is_err() {
            errors.push(ValidationError::InvalidMethod {
                route: route.name.clone(),
                method: route.method.clone(),
            });
        }

        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPathPrefix(route.name.clone()));
        }

        if route.target.host.is_empty() {
            errors.push(ValidationError::EmptyTargetHost(route.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
