//! HTTP transport
//!
//! Serves the page permission API over HTTP with request tracing.

use crate::error::TransportError;
use crate::server::{AppState, router};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Default port for the HTTP transport
pub const DEFAULT_HTTP_PORT: u16 = 20290;

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to bind to (e.g., "127.0.0.1:20290")
    pub bind: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_HTTP_PORT)),
        }
    }
}

impl HttpConfig {
    /// Create a new HTTP config with the specified bind address
    pub fn new(bind: SocketAddr) -> Self {
        Self { bind }
    }

    /// Create config from host and port strings
    pub fn from_host_port(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        Ok(Self::new(addr))
    }
}

/// The API router wrapped in request tracing
pub fn build_app(state: AppState) -> Router {
    router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Serve `app` until `ct` is cancelled
pub async fn run_http(
    app: Router,
    config: HttpConfig,
    ct: CancellationToken,
) -> Result<(), TransportError> {
    let listener = TcpListener::bind(config.bind).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Serve `app` and wait for a shutdown signal (Ctrl+C)
pub async fn run_http_blocking(app: Router, config: HttpConfig) -> Result<(), TransportError> {
    let ct = CancellationToken::new();

    let signal_ct = ct.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
        }
        signal_ct.cancel();
    });

    info!("Press Ctrl+C to stop the server");
    run_http(app, config, ct).await
}
