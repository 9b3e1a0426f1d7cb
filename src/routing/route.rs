//! Route definition and identity.

use std::fmt;

use axum::http::Method;
use url::Url;
use uuid::Uuid;

use crate::config::RouteConfig;
use crate::error::Error;

/// Opaque route identifier assigned at registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteId(Uuid);

impl RouteId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Backend target address parts.
///
/// The base URL is parsed once at construction, so malformed targets are
/// rejected before the route can receive traffic.
#[derive(Debug, Clone)]
pub struct RouteTarget {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub endpoint: String,
    base_url: Url,
}

impl RouteTarget {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Result<Self, Error> {
        let scheme = scheme.into();
        let host = host.into();
        let endpoint = endpoint.into();
        let base_url = Url::parse(&format!("{}://{}:{}{}", scheme, host, port, endpoint))
            .map_err(|e| Error::Configuration(format!("invalid target URL: {}", e)))?;
        Ok(Self {
            scheme,
            host,
            port,
            endpoint,
            base_url,
        })
    }

    /// Pre-built base URL for this target.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `host:port` authority string for URI rewriting.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A registered route: matching key, backend target, selection attributes.
///
/// Routes are immutable once registered; changes go through removal and
/// re-registration.
#[derive(Debug)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub method: Method,
    pub path_prefix: String,
    pub target: RouteTarget,
    pub weight: u32,
    pub enabled: bool,
}

impl Route {
    /// Build a route from its config entry, assigning a fresh id.
    pub fn from_config(config: &RouteConfig) -> Result<Self, Error> {
        let method = Method::from_bytes(config.method.to_uppercase().as_bytes())
            .map_err(|_| Error::Configuration(format!("unknown HTTP method {:?}", config.method)))?;
        if !config.path_prefix.starts_with('/') {
            return Err(Error::Configuration(format!(
                "route {:?}: path_prefix must start with '/'",
                config.name
            )));
        }
        let target = RouteTarget::new(
            config.target.scheme.clone(),
            config.target.host.clone(),
            config.target.port,
            config.target.endpoint.clone(),
        )?;
        Ok(Self {
            id: RouteId::new(),
            name: config.name.clone(),
            method,
            path_prefix: config.path_prefix.clone(),
            target,
            weight: config.weight,
            enabled: config.enabled,
        })
    }

    /// Weight with non-positive values normalized to 1.
    pub fn effective_weight(&self) -> u32 {
        self.weight.max(1)
    }
}
