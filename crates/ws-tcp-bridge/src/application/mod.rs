//! Application layer for ws-tcp-bridge.
//!
//! Knows *what* crosses the bridge and delegates *how* to the
//! infrastructure layer.
//!
//! # Responsibilities
//!
//! - Framing client messages as backend lines
//! - Decoding backend chunks and binary frames to text
//! - The bounded queue used while the backend connect is in flight
//! - Defining `BridgeError` and the diagnostic text derived from it
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or listening for connections (that is infrastructure)
//! - Tokio task spawning
//! - WebSocket framing (handled by axum)

pub mod relay;

pub use relay::{
    decode_payload, diagnostic_text, frame_for_backend, BridgeError, PendingLines,
    DIAGNOSTIC_PREFIX,
};
