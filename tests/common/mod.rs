//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use traffic_controller::config::{GatewayConfig, RouteConfig, TargetConfig};
use traffic_controller::controller::TrafficController;
use traffic_controller::http::HttpServer;
use traffic_controller::invoker::HttpInvoker;
use traffic_controller::lifecycle::Shutdown;
use traffic_controller::observability::NoopSink;

/// Start a simple mock backend that returns a fixed body. Returns the
/// address it bound.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, response.to_string()) }).await
}

/// Start a programmable mock backend. Returns the address it bound.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Backend that drops connections without responding while `healthy` is
/// false, and serves 200 "ok" once it flips true. A dropped connection
/// surfaces as a transport error at the gateway.
pub async fn start_toggle_backend(healthy: Arc<std::sync::atomic::AtomicBool>) -> SocketAddr {
    use std::sync::atomic::Ordering;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    if healthy.load(Ordering::SeqCst) {
                        let _ = socket
                            .write_all(
                                b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                            )
                            .await;
                        let _ = socket.shutdown().await;
                    }
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing listens on; connections to it are refused.
pub async fn dead_backend_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Build a route config entry pointing at a backend address.
pub fn route_to(name: &str, prefix: &str, weight: u32, backend: SocketAddr) -> RouteConfig {
    RouteConfig {
        name: name.to_string(),
        method: "GET".to_string(),
        path_prefix: prefix.to_string(),
        target: TargetConfig {
            scheme: "http".to_string(),
            host: backend.ip().to_string(),
            port: backend.port(),
            endpoint: String::new(),
        },
        weight,
        enabled: true,
    }
}

/// Spawn a gateway server for the config. Returns its address and the
/// shutdown handle to stop it.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let controller = Arc::new(
        TrafficController::new(&config, Arc::new(HttpInvoker::new()), Arc::new(NoopSink))
            .expect("test config is valid"),
    );
    let server = HttpServer::new(config, controller);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, &server_shutdown).await;
    });

    // Let the accept loop come up before the first request.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

/// A reqwest client that never pools or proxies, so each request hits
/// the gateway fresh.
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
