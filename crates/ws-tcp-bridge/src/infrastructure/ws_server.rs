//! HTTP/WebSocket server: listener, routing and graceful shutdown.
//!
//! One listener serves both surfaces:
//!
//! - `GET <ws_path>` (and `<ws_path>/`, any query string) upgrades to a
//!   WebSocket and hands the socket to [`run_session`].
//! - Every other request falls through to the static web client in
//!   `static_dir`.
//!
//! Each upgraded session runs in its own Tokio task (axum spawns it), so a
//! slow client never blocks others and sessions share nothing but the
//! read-only [`BridgeConfig`].

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::BridgeConfig;
use crate::infrastructure::session::run_session;

// ── Public API ────────────────────────────────────────────────────────────────

/// Builds the router: WebSocket upgrade on the configured path, static files
/// everywhere else.
pub fn build_router(config: Arc<BridgeConfig>) -> Router {
    let static_files = ServeDir::new(&config.static_dir);
    let ws_path = config.ws_path.clone();
    let ws_path_with_slash = config.ws_path_with_slash();

    Router::new()
        .route(&ws_path, get(ws_handler))
        .route(&ws_path_with_slash, get(ws_handler))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(config)
}

/// Binds `config.listen_addr` and serves until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound (e.g. the port is
/// already in use) or the server loop fails.
pub async fn run_server<F>(config: BridgeConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.listen_addr))?;

    serve(listener, config, shutdown).await
}

/// Serves on an already-bound listener until `shutdown` resolves.
///
/// Split from [`run_server`] so tests can bind port 0 and learn the address
/// before the server starts.
///
/// # Errors
///
/// Returns an error if the server loop fails.
pub async fn serve<F>(listener: TcpListener, config: BridgeConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;

    info!(
        "bridge listening on http://{local_addr} (WS {}) → TCP {} (static files from {})",
        config.ws_path,
        config.backend_addr(),
        config.static_dir.display()
    );

    let app = build_router(Arc::new(config));

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("HTTP server failed")?;

    info!("listener on {local_addr} stopped");
    Ok(())
}

// ── Upgrade handler ───────────────────────────────────────────────────────────

/// Accepts the WebSocket upgrade and starts the session.
///
/// The upgrade completes before the backend connection is attempted.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(config): State<Arc<BridgeConfig>>,
) -> Response {
    info!("session {peer}: WebSocket connected");
    ws.on_upgrade(move |socket| run_session(socket, peer, config))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_serve_returns_after_shutdown_signal() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, BridgeConfig::default(), async move {
            let _ = stop_rx.await;
        }));

        // Act
        stop_tx.send(()).unwrap();

        // Assert
        let result = timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_server_fails_when_port_is_taken() {
        // Arrange: hold the port so the bridge cannot bind it
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = BridgeConfig {
            listen_addr: occupied.local_addr().unwrap(),
            ..BridgeConfig::default()
        };

        // Act
        let result = run_server(config, std::future::pending()).await;

        // Assert
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("failed to bind listener"));
    }
}
