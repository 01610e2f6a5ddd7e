//! Domain layer for ws-tcp-bridge.
//!
//! Pure types with no dependencies on I/O, networking, or external frameworks.
//!
//! # What belongs in the domain layer?
//!
//! - Configuration structures
//! - The relay's view of a WebSocket message and of a close
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, `TcpStream`, `axum` or WebSocket types
//! - Environment variable reading

pub mod config;
pub mod messages;

pub use config::BridgeConfig;
pub use messages::{ClientFrame, CloseReason};
