//! Request orchestration.
//!
//! # Data Flow
//! ```text
//! handle(client_key, request)
//!     → ratelimit (admission per client)
//!     → routing (candidates by method + path)
//!     → load_balancer (pick one candidate)
//!     → resilience (per-route breaker wraps the invoker call, retries)
//!     → response / error taxonomy back to the caller
//! ```
//!
//! # Design Decisions
//! - All shared state (route table, breaker map, limiter entries) is
//!   owned by the controller instance; multiple controllers coexist in
//!   one process
//! - Selection is independent of breaker state; what happens when the
//!   selected route's circuit is open is a configured policy
//! - Retries stay on the already-selected route and stop as soon as its
//!   breaker stops admitting calls
//! - Side effects are metrics events through the sink; the controller
//!   does not log

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Request, Response};
use dashmap::DashMap;

use crate::config::{
    BreakerConfig, GatewayConfig, RetryConfig, SelectionConfig, SelectionStrategy,
};
use crate::error::Error;
use crate::invoker::Invoker;
use crate::load_balancer::{RoundRobin, RouteSelector, Weighted};
use crate::observability::MetricsSink;
use crate::ratelimit::FixedWindowLimiter;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::retries::is_retryable;
use crate::resilience::{BreakerSnapshot, CircuitBreaker, CircuitState};
use crate::routing::{Route, RouteId, RouteTable};

/// Per-route traffic controller: admission control, weighted selection,
/// and circuit breaking composed per request.
pub struct TrafficController {
    table: RouteTable,
    breakers: DashMap<RouteId, Arc<CircuitBreaker>>,
    limiter: Option<FixedWindowLimiter>,
    selector: Box<dyn RouteSelector>,
    invoker: Arc<dyn Invoker>,
    breaker_config: BreakerConfig,
    retry_config: RetryConfig,
    selection: SelectionConfig,
    sink: Arc<dyn MetricsSink>,
}

impl TrafficController {
    /// Build a controller from config, registering its routes. Invalid
    /// parameters fail here, never at request time.
    pub fn new(
        config: &GatewayConfig,
        invoker: Arc<dyn Invoker>,
        sink: Arc<dyn MetricsSink>,
    ) -> Result<Self, Error> {
        if config.breaker.failure_threshold == 0 {
            return Err(Error::Configuration(
                "breaker failure_threshold must be positive".to_string(),
            ));
        }
        if config.breaker.recovery_timeout_ms == 0 {
            return Err(Error::Configuration(
                "breaker recovery_timeout_ms must be positive".to_string(),
            ));
        }
        if config.breaker.call_timeout_ms == 0 {
            return Err(Error::Configuration(
                "breaker call_timeout_ms must be positive".to_string(),
            ));
        }

        let limiter = if config.rate_limit.enabled {
            Some(FixedWindowLimiter::new(
                config.rate_limit.max_requests,
                Duration::from_millis(config.rate_limit.window_ms),
                config.rate_limit.idle_windows,
            )?)
        } else {
            None
        };

        let selector: Box<dyn RouteSelector> = match config.selection.strategy {
            SelectionStrategy::Weighted => Box::new(Weighted::new()),
            SelectionStrategy::RoundRobin => Box::new(RoundRobin::new()),
        };

        let controller = Self {
            table: RouteTable::new(),
            breakers: DashMap::new(),
            limiter,
            selector,
            invoker,
            breaker_config: config.breaker.clone(),
            retry_config: config.retries.clone(),
            selection: config.selection.clone(),
            sink,
        };

        for route_config in &config.routes {
            controller.register_route(Route::from_config(route_config)?);
        }

        Ok(controller)
    }

    /// Register a route. Returns the id callers use for removal and
    /// introspection.
    pub fn register_route(&self, route: Route) -> RouteId {
        self.table.register(route)
    }

    /// Remove a route and its breaker. Returns false for unknown ids.
    pub fn remove_route(&self, id: &RouteId) -> bool {
        self.breakers.remove(id);
        self.table.remove(id)
    }

    /// Breaker state for a route. Routes never dispatched to report a
    /// fresh Closed breaker. Read-only.
    pub fn breaker_snapshot(&self, id: &RouteId) -> Option<BreakerSnapshot> {
        if let Some(breaker) = self.breakers.get(id) {
            return Some(breaker.snapshot());
        }
        self.table.get(id).map(|_| BreakerSnapshot {
            state: CircuitState::Closed,
            consecutive_failures: 0,
        })
    }

    /// All routes with their breaker snapshots, for introspection
    /// surfaces.
    pub fn route_snapshots(&self) -> Vec<(Arc<Route>, BreakerSnapshot)> {
        self.table
            .all()
            .into_iter()
            .map(|route| {
                let snapshot = self.breaker_snapshot(&route.id).unwrap_or(BreakerSnapshot {
                    state: CircuitState::Closed,
                    consecutive_failures: 0,
                });
                (route, snapshot)
            })
            .collect()
    }

    /// Evict idle rate-limit entries. Driven by an external scheduler.
    pub fn sweep(&self, now: std::time::Instant) -> usize {
        self.limiter.as_ref().map(|l| l.sweep(now)).unwrap_or(0)
    }

    /// Handle one request on behalf of `client_key`.
    pub async fn handle(
        &self,
        client_key: &str,
        request: Request<Bytes>,
    ) -> Result<Response<Body>, Error> {
        if let Some(limiter) = &self.limiter {
            if !limiter.allow(client_key) {
                self.sink
                    .record("rate_limited", &[("client", client_key.to_string())]);
                return Err(Error::RateLimited {
                    client: client_key.to_string(),
                });
            }
        }

        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let candidates = self.table.candidates(&method, &path);
        if candidates.is_empty() {
            return Err(Error::RouteNotFound { method, path });
        }

        let route = self.selector.pick(&candidates)?;
        self.sink
            .record("route_selected", &[("route", route.name.clone())]);

        match self.dispatch(&route, &request).await {
            Err(Error::CircuitOpen { .. })
                if self.selection.reselect_on_open && candidates.len() > 1 =>
            {
                self.reselect(&candidates, &route, &request).await
            }
            other => other,
        }
    }

    /// Run the breaker-guarded call with bounded retries against the
    /// same route.
    async fn dispatch(
        &self,
        route: &Arc<Route>,
        request: &Request<Bytes>,
    ) -> Result<Response<Body>, Error> {
        let breaker = self.breaker_for(route)?;
        let max_attempts = if self.retry_config.enabled {
            self.retry_config.max_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match breaker
                .execute(self.invoker.as_ref(), route, clone_request(request))
                .await
            {
                Ok(response) => {
                    self.sink.record(
                        "request_completed",
                        &[
                            ("route", route.name.clone()),
                            ("attempts", attempt.to_string()),
                        ],
                    );
                    return Ok(response);
                }
                Err(err) => {
                    if attempt < max_attempts && is_retryable(&err) && breaker.admits() {
                        let delay = calculate_backoff(
                            attempt,
                            self.retry_config.base_delay_ms,
                            self.retry_config.max_delay_ms,
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    self.sink.record(
                        "request_failed",
                        &[("route", route.name.clone()), ("kind", err.kind().to_string())],
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Alternative policy when the selected route's circuit is open:
    /// keep selecting among the remaining candidates, each tried at most
    /// once.
    async fn reselect(
        &self,
        candidates: &[Arc<Route>],
        blocked: &Arc<Route>,
        request: &Request<Bytes>,
    ) -> Result<Response<Body>, Error> {
        let mut remaining: Vec<Arc<Route>> = candidates
            .iter()
            .filter(|r| r.id != blocked.id)
            .cloned()
            .collect();
        let mut last_open = Error::CircuitOpen {
            route: blocked.id.clone(),
        };

        while !remaining.is_empty() {
            let route = match self.selector.pick(&remaining) {
                Ok(route) => route,
                Err(_) => break,
            };
            self.sink
                .record("route_selected", &[("route", route.name.clone())]);
            match self.dispatch(&route, request).await {
                Err(err @ Error::CircuitOpen { .. }) => {
                    remaining.retain(|r| r.id != route.id);
                    last_open = err;
                }
                other => return other,
            }
        }

        Err(last_open)
    }

    fn breaker_for(&self, route: &Arc<Route>) -> Result<Arc<CircuitBreaker>, Error> {
        if let Some(breaker) = self.breakers.get(&route.id) {
            return Ok(breaker.clone());
        }
        let breaker = Arc::new(CircuitBreaker::new(
            route,
            &self.breaker_config,
            self.sink.clone(),
        )?);
        Ok(self
            .breakers
            .entry(route.id.clone())
            .or_insert(breaker)
            .value()
            .clone())
    }
}

/// Rebuild a request from its (cheaply cloneable) parts for a fresh
/// attempt.
fn clone_request(request: &Request<Bytes>) -> Request<Bytes> {
    let mut builder = Request::builder()
        .method(request.method().clone())
        .uri(request.uri().clone())
        .version(request.version());
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in request.headers() {
            headers.insert(name.clone(), value.clone());
        }
    }
    builder
        .body(request.body().clone())
        .expect("request parts are valid")
}
