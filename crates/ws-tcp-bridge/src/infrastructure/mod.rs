//! Infrastructure layer for ws-tcp-bridge.
//!
//! Handles all I/O: serving HTTP and WebSocket upgrades to clients and
//! opening TCP connections to the backend.
//!
//! # Responsibilities
//!
//! - Binding the HTTP/WebSocket listener and serving static files
//! - Opening, reading, writing and half-closing backend TCP connections
//! - Running the per-session relay tasks
//! - Handling the graceful shutdown signal
//!
//! # What does NOT belong here?
//!
//! - Framing rules (that is the application layer)
//! - Configuration parsing (that is done in `main.rs`)

pub mod backend_conn;
pub mod session;
pub mod ws_server;

pub use ws_server::{build_router, run_server, serve};
