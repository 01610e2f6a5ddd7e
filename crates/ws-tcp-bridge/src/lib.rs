//! ws-tcp-bridge library crate.
//!
//! Relays each browser WebSocket session to its own TCP connection on a
//! line-oriented backend, and serves the static web client on the same port.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Browser (text over WebSocket, /ws)
//!         ↕
//! [ws-tcp-bridge]
//!   ├── domain/           Pure types: BridgeConfig, ClientFrame, CloseReason
//!   ├── application/      Relay rules: line framing, decoding, pending queue
//!   └── infrastructure/
//!         ├── ws_server/    axum router, listener, static files
//!         ├── session/      Per-session relay tasks
//!         └── backend_conn/ TCP connection to the backend
//!         ↕
//! Backend (newline-terminated text over TCP)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no external dependencies (no I/O, no async, no frameworks).
//! - `application` depends on `domain` only.
//! - `infrastructure` depends on all other layers plus `tokio` and `axum`.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: relay rules.
pub mod application;

/// Infrastructure layer: HTTP/WebSocket server and backend TCP connections.
pub mod infrastructure;
