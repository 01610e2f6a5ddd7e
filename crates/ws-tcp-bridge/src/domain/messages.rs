//! What the relay makes of WebSocket traffic.
//!
//! The relay does not interpret payloads. All it needs to know about a
//! WebSocket message is whether it carries data for the backend, is protocol
//! housekeeping, or ends the session. [`ClientFrame`] captures exactly that,
//! and [`CloseReason`] describes how the bridge ends a session from its side.
//!
//! # Message flow
//!
//! ```text
//! Client → Bridge:  WebSocket frame  →  ClientFrame::Payload  →  "<text>\n" → Backend
//! Backend → Bridge: TCP chunk        →  text frame            →  Client
//! ```

/// One WebSocket message as seen by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// Data for the backend, already decoded to text.
    ///
    /// Text frames carry their string unchanged. Binary frames are decoded
    /// as UTF-8 with invalid sequences replaced.
    Payload(String),

    /// Ping/Pong housekeeping; never forwarded.
    Control,

    /// The client started the closing handshake.
    Close,
}

/// Why the bridge closes a client WebSocket.
///
/// Sent as the close frame's code and reason so the web client can tell a
/// normal backend hang-up from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The backend closed its TCP connection cleanly (EOF).
    BackendClosed,

    /// The backend TCP connection failed (connect, read or write error).
    BackendFailed,
}

impl CloseReason {
    /// RFC 6455 close code: 1000 (normal) or 1011 (internal error).
    pub fn code(self) -> u16 {
        match self {
            CloseReason::BackendClosed => 1000,
            CloseReason::BackendFailed => 1011,
        }
    }

    /// Short human-readable close reason.
    pub fn reason(self) -> &'static str {
        match self {
            CloseReason::BackendClosed => "backend closed",
            CloseReason::BackendFailed => "backend error",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_closed_uses_normal_close_code() {
        assert_eq!(CloseReason::BackendClosed.code(), 1000);
        assert_eq!(CloseReason::BackendClosed.reason(), "backend closed");
    }

    #[test]
    fn test_backend_failed_uses_internal_error_close_code() {
        assert_eq!(CloseReason::BackendFailed.code(), 1011);
        assert_eq!(CloseReason::BackendFailed.reason(), "backend error");
    }

    #[test]
    fn test_close_reasons_fit_in_a_control_frame() {
        // Close frame payloads are capped at 125 bytes, 2 of which are the code.
        for reason in [CloseReason::BackendClosed, CloseReason::BackendFailed] {
            assert!(reason.reason().len() <= 123);
        }
    }
}
