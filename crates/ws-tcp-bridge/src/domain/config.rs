//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup from CLI arguments / environment variables
//! (see `main.rs`) and then shared read-only across every session.
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! reads inside the relay) lets the tests run a bridge against any backend
//! address without touching the process environment.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default HTTP/WebSocket listener port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default backend host.
pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";

/// Default backend TCP port.
pub const DEFAULT_BACKEND_PORT: u16 = 12345;

/// Default WebSocket upgrade path.
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Default directory served at the HTTP root.
pub const DEFAULT_STATIC_DIR: &str = "public";

/// Default number of client messages held while the backend connect is in flight.
pub const DEFAULT_PENDING_LIMIT: usize = 64;

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use ws_tcp_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.listen_addr.port(), 8080);
/// assert_eq!(cfg.backend_addr(), "127.0.0.1:12345");
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the HTTP/WebSocket server binds to.
    pub listen_addr: SocketAddr,

    /// Hostname or IP of the backend TCP service.
    ///
    /// Kept as a string so DNS names resolve at connect time.
    pub backend_host: String,

    /// TCP port of the backend service. Never zero once validated.
    pub backend_port: u16,

    /// Path that accepts the WebSocket upgrade (`/ws`). The same path with a
    /// trailing slash is accepted too.
    pub ws_path: String,

    /// Directory of static files served at the HTTP root.
    pub static_dir: PathBuf,

    /// Upper bound on client messages queued before the backend connection
    /// is ready. Messages past the bound are dropped.
    pub pending_limit: usize,
}

impl BridgeConfig {
    /// Returns the backend target as `host:port`, for logs and diagnostics.
    pub fn backend_addr(&self) -> String {
        format!("{}:{}", self.backend_host, self.backend_port)
    }

    /// Returns the upgrade path with a trailing slash (`/ws/`).
    pub fn ws_path_with_slash(&self) -> String {
        format!("{}/", self.ws_path)
    }
}

impl Default for BridgeConfig {
    /// | Field         | Default           |
    /// |---------------|-------------------|
    /// | listen_addr   | `0.0.0.0:8080`    |
    /// | backend       | `127.0.0.1:12345` |
    /// | ws_path       | `/ws`             |
    /// | static_dir    | `public`          |
    /// | pending_limit | 64                |
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            backend_host: DEFAULT_BACKEND_HOST.to_string(),
            backend_port: DEFAULT_BACKEND_PORT,
            ws_path: DEFAULT_WS_PATH.to_string(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            pending_limit: DEFAULT_PENDING_LIMIT,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listen_port_is_8080() {
        // Arrange / Act
        let cfg = BridgeConfig::default();
        // Assert
        assert_eq!(cfg.listen_addr.port(), 8080);
    }

    #[test]
    fn test_default_listen_ip_is_unspecified() {
        let cfg = BridgeConfig::default();
        assert!(cfg.listen_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_backend_is_loopback_12345() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.backend_host, "127.0.0.1");
        assert_eq!(cfg.backend_port, 12345);
    }

    #[test]
    fn test_default_ws_path_is_ws() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.ws_path, "/ws");
        assert_eq!(cfg.ws_path_with_slash(), "/ws/");
    }

    #[test]
    fn test_default_static_dir_is_public() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.static_dir, PathBuf::from("public"));
    }

    #[test]
    fn test_default_pending_limit() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.pending_limit, DEFAULT_PENDING_LIMIT);
    }

    #[test]
    fn test_backend_addr_joins_host_and_port() {
        // Arrange: a DNS name must be kept verbatim, not resolved
        let cfg = BridgeConfig {
            backend_host: "game.internal".to_string(),
            backend_port: 4000,
            ..BridgeConfig::default()
        };

        // Act / Assert
        assert_eq!(cfg.backend_addr(), "game.internal:4000");
    }

    #[test]
    fn test_config_can_be_cloned() {
        // Cloneability lets tests derive variants from one base config.
        let cfg = BridgeConfig::default();
        let cloned = cfg.clone();
        assert_eq!(cfg.listen_addr, cloned.listen_addr);
        assert_eq!(cfg.backend_addr(), cloned.backend_addr());
    }
}
