//! HTTP server surface for the traffic controller.
//!
//! # Responsibilities
//! - Create the Axum router with gateway and admin handlers
//! - Wire up middleware (request timeout, request IDs, tracing)
//! - Derive the client key from the peer address
//! - Buffer request bodies so the controller can re-send on retries
//! - Map the controller's error taxonomy to HTTP status codes
//! - Drive the rate-limit sweeper until shutdown
//!
//! No traffic-control semantics live here; this is a thin adapter over
//! [`TrafficController`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::controller::TrafficController;
use crate::http::admin;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

const MAX_BUFFERED_BODY: usize = 2 * 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<TrafficController>,
}

/// HTTP server fronting a traffic controller.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    controller: Arc<TrafficController>,
}

impl HttpServer {
    /// Create a server for an already-constructed controller.
    pub fn new(config: GatewayConfig, controller: Arc<TrafficController>) -> Self {
        let state = AppState {
            controller: controller.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            controller,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/admin/status", get(admin::get_status))
            .route("/admin/breakers", get(admin::get_breakers))
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal fires. Also drives the
    /// periodic rate-limit sweep.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweep_interval =
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs.max(1));
        let sweeper_controller = self.controller.clone();
        let mut sweeper_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = sweeper_controller.sweep(Instant::now());
                        if evicted > 0 {
                            tracing::debug!(evicted, "Swept idle rate-limit entries");
                        }
                    }
                    _ = sweeper_shutdown.recv() => break,
                }
            }
        });

        let mut server_shutdown = shutdown.subscribe();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Main gateway handler.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let client_key = addr.ip().to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    // Buffer the body up front; retries need to re-send it.
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BUFFERED_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };
    let request = Request::from_parts(parts, body);

    match state.controller.handle(&client_key, request).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), &path, start_time);
            response.into_response()
        }
        Err(err) => {
            let status = err.status();
            tracing::warn!(
                client = %client_key,
                method = %method,
                path = %path,
                kind = err.kind(),
                error = %err,
                "Request rejected"
            );
            metrics::record_request(&method, status.as_u16(), &path, start_time);
            (status, err.to_string()).into_response()
        }
    }
}
