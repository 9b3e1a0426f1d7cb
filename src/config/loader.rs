//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Validation(Vec<ValidationError>),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_parses() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:8080"

            [[routes]]
            name = "users"
            method = "GET"
            path_prefix = "/users"
            target = { host = "127.0.0.1", port = 3001 }

            [rate_limit]
            max_requests = 50
            window_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].weight, 1);
        assert!(config.routes[0].enabled);
        assert_eq!(config.routes[0].target.scheme, "http");
        assert_eq!(config.rate_limit.max_requests, 50);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [rate_limit]
            window_ms = 0
            "#,
        )
        .unwrap();
        assert!(matches!(
            validate_config(&config).map_err(ConfigError::Validation),
            Err(ConfigError::Validation(_))
        ));
    }
}
