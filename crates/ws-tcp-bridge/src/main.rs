//! ws-tcp-bridge: entry point.
//!
//! Accepts WebSocket connections from browsers on `/ws` and relays each one
//! to its own TCP connection on a line-oriented backend. The same port serves
//! the static web client.
//!
//! # Usage
//!
//! ```text
//! ws-tcp-bridge [OPTIONS]
//!
//! Options:
//!   --port          <PORT>  HTTP/WebSocket listener port [default: 8080]
//!   --bind          <IP>    Listener bind address [default: 0.0.0.0]
//!   --backend-host  <HOST>  Backend hostname or IP [default: 127.0.0.1]
//!   --backend-port  <PORT>  Backend TCP port [default: 12345]
//!   --static-dir    <DIR>   Static web client directory [default: public]
//!   --ws-path       <PATH>  WebSocket upgrade path [default: /ws]
//!   --pending-limit <N>     Messages queued while the backend connects [default: 64]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable        | Default     |
//! |-----------------|-------------|
//! | `PORT`          | `8080`      |
//! | `BIND_HOST`     | `0.0.0.0`   |
//! | `BACKEND_HOST`  | `127.0.0.1` |
//! | `BACKEND_PORT`  | `12345`     |
//! | `STATIC_DIR`    | `public`    |
//! | `WS_PATH`       | `/ws`       |
//! | `PENDING_LIMIT` | `64`        |
//!
//! Invalid numbers (e.g. `PORT=abc`, `BACKEND_PORT=70000`) abort startup with
//! a usage error and a non-zero exit code.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{ensure, Context};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ws_tcp_bridge::domain::config::{
    BridgeConfig, DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT, DEFAULT_PENDING_LIMIT, DEFAULT_PORT,
    DEFAULT_STATIC_DIR, DEFAULT_WS_PATH,
};
use ws_tcp_bridge::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// WebSocket-to-TCP line relay.
///
/// Each browser WebSocket session gets its own TCP connection to the backend.
#[derive(Debug, Parser)]
#[command(
    name = "ws-tcp-bridge",
    about = "Relays browser WebSocket sessions to a line-oriented TCP backend",
    version
)]
struct Cli {
    /// TCP port for the HTTP/WebSocket listener.
    #[arg(long, default_value_t = DEFAULT_PORT, env = "PORT")]
    port: u16,

    /// IP address to bind the listener to.
    ///
    /// `0.0.0.0` accepts connections on every interface; `127.0.0.1` only
    /// local ones.
    #[arg(long, default_value = "0.0.0.0", env = "BIND_HOST")]
    bind: String,

    /// Hostname or IP address of the backend.
    #[arg(long, default_value = DEFAULT_BACKEND_HOST, env = "BACKEND_HOST")]
    backend_host: String,

    /// TCP port of the backend.
    #[arg(long, default_value_t = DEFAULT_BACKEND_PORT, env = "BACKEND_PORT")]
    backend_port: u16,

    /// Directory of static files served at the HTTP root.
    #[arg(long, default_value = DEFAULT_STATIC_DIR, env = "STATIC_DIR")]
    static_dir: PathBuf,

    /// Path that accepts the WebSocket upgrade.
    #[arg(long, default_value = DEFAULT_WS_PATH, env = "WS_PATH")]
    ws_path: String,

    /// Client messages held while the backend connection is being opened.
    #[arg(long, default_value_t = DEFAULT_PENDING_LIMIT, env = "PENDING_LIMIT")]
    pending_limit: usize,
}

impl Cli {
    /// Validates the parsed arguments and converts them into a
    /// [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not an IP address, `--backend-host` is
    /// empty, `--backend-port` is 0, or `--ws-path` is not an absolute path
    /// other than `/` without a trailing slash.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let bind_ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        let backend_host = self.backend_host.trim().to_string();
        ensure!(!backend_host.is_empty(), "backend host must not be empty");
        ensure!(self.backend_port != 0, "backend port must be between 1 and 65535");

        ensure!(
            self.ws_path.starts_with('/') && self.ws_path.len() > 1 && !self.ws_path.ends_with('/'),
            "invalid WebSocket path '{}': expected an absolute path like /ws",
            self.ws_path
        );

        Ok(BridgeConfig {
            listen_addr: SocketAddr::new(bind_ip, self.port),
            backend_host,
            backend_port: self.backend_port,
            ws_path: self.ws_path,
            static_dir: self.static_dir,
            pending_limit: self.pending_limit,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// 1. Initialise `tracing_subscriber` (level from `RUST_LOG`, default `info`).
/// 2. Parse and validate the configuration; exit non-zero if it is invalid.
/// 3. Serve until Ctrl+C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_bridge_config()?;

    info!(
        "ws-tcp-bridge starting: listen={}, backend={}",
        config.listen_addr,
        config.backend_addr()
    );

    run_server(config, shutdown_signal()).await?;

    info!("ws-tcp-bridge stopped");
    Ok(())
}

/// Resolves on Ctrl+C (SIGINT on Unix).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, initiating graceful shutdown"),
        Err(e) => {
            // Without a signal handler, keep serving rather than exit at once.
            error!("failed to listen for Ctrl+C signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
