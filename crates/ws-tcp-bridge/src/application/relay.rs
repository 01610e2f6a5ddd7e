//! Core relay rules.
//!
//! Pure functions and types that decide what crosses the bridge in each
//! direction. Nothing here touches sockets or async runtimes, so the rules
//! can be unit tested in isolation.
//!
//! # Directions
//!
//! ```text
//! Client → Backend:  text            → frame_for_backend()  → "<text>\n"
//! Backend → Client:  bytes (1 chunk) → decode_payload()     → one text message
//! ```

use std::collections::VecDeque;
use std::io;

use thiserror::Error;

/// Line terminator expected by the line-oriented backend.
pub const LINE_TERMINATOR: char = '\n';

/// Prefix of the diagnostic text sent to a client after a backend failure.
pub const DIAGNOSTIC_PREFIX: &str = "[Bridge] TCP error: ";

// ── Error type ────────────────────────────────────────────────────────────────

/// A TCP connection error on the backend side of a session.
///
/// The variants exist for logging only: every variant is reported to the
/// client the same way (one diagnostic message, then close).
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The initial connection to the backend could not be established.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Reading from the backend failed mid-stream (e.g. connection reset).
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// Writing to the backend failed mid-stream.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
}

// ── Client → Backend ──────────────────────────────────────────────────────────

/// Frames one client message as a backend line.
///
/// Appends a single `\n` if and only if `text` does not already end with one.
/// Nothing else about the text changes.
///
/// # Example
///
/// ```rust
/// use ws_tcp_bridge::application::frame_for_backend;
///
/// assert_eq!(frame_for_backend("login bob"), "login bob\n");
/// assert_eq!(frame_for_backend("login bob\n"), "login bob\n");
/// ```
pub fn frame_for_backend(text: &str) -> String {
    let mut line = String::with_capacity(text.len() + 1);
    line.push_str(text);
    if !text.ends_with(LINE_TERMINATOR) {
        line.push(LINE_TERMINATOR);
    }
    line
}

// ── Backend → Client ──────────────────────────────────────────────────────────

/// Decodes raw bytes as UTF-8 text, replacing invalid sequences with U+FFFD.
///
/// Used for backend chunks (one call per TCP read, no reassembly) and for
/// binary client frames.
pub fn decode_payload(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Builds the diagnostic text sent to the client after a backend failure.
pub fn diagnostic_text(err: &BridgeError) -> String {
    format!("{DIAGNOSTIC_PREFIX}{err}")
}

// ── Pending lines ─────────────────────────────────────────────────────────────

/// Bounded FIFO of framed client lines waiting for the backend connection.
///
/// The first `limit` lines are kept in arrival order. Later lines are
/// rejected and counted; they are never delivered.
#[derive(Debug)]
pub struct PendingLines {
    lines: VecDeque<String>,
    limit: usize,
    dropped: usize,
}

impl PendingLines {
    /// Creates an empty queue holding at most `limit` lines.
    pub fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            limit,
            dropped: 0,
        }
    }

    /// Queues a framed line. Returns `false` (and drops the line) when the
    /// queue is full.
    pub fn push(&mut self, line: String) -> bool {
        if self.lines.len() >= self.limit {
            self.dropped += 1;
            return false;
        }
        self.lines.push_back(line);
        true
    }

    /// Number of lines currently queued.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no lines are queued.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines rejected because the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Removes and returns all queued lines in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = String> + '_ {
        self.lines.drain(..)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── frame_for_backend ─────────────────────────────────────────────────────

    #[test]
    fn test_frame_appends_newline_when_missing() {
        // Arrange / Act
        let line = frame_for_backend("login bob");

        // Assert
        assert_eq!(line, "login bob\n");
    }

    #[test]
    fn test_frame_keeps_existing_trailing_newline() {
        // A message that already ends with '\n' must not gain a second one.
        assert_eq!(frame_for_backend("welcome\n"), "welcome\n");
    }

    #[test]
    fn test_frame_empty_message_becomes_bare_newline() {
        assert_eq!(frame_for_backend(""), "\n");
    }

    #[test]
    fn test_frame_only_checks_the_last_character() {
        // Embedded newlines are payload; only the tail decides framing.
        assert_eq!(frame_for_backend("a\nb"), "a\nb\n");
    }

    #[test]
    fn test_frame_crlf_terminated_message_is_unchanged() {
        // "\r\n" already ends with '\n'.
        assert_eq!(frame_for_backend("vote 3\r\n"), "vote 3\r\n");
    }

    #[test]
    fn test_frame_trailing_carriage_return_still_gets_newline() {
        assert_eq!(frame_for_backend("quit\r"), "quit\r\n");
    }

    #[test]
    fn test_frame_preserves_multibyte_text() {
        assert_eq!(frame_for_backend("chào 👤"), "chào 👤\n");
    }

    // ── decode_payload ────────────────────────────────────────────────────────

    #[test]
    fn test_decode_valid_utf8_is_verbatim() {
        assert_eq!(decode_payload(b"welcome bob\n"), "welcome bob\n");
    }

    #[test]
    fn test_decode_empty_chunk_is_empty_text() {
        assert_eq!(decode_payload(b""), "");
    }

    #[test]
    fn test_decode_invalid_utf8_is_replaced_not_rejected() {
        // Arrange: 0xFF never appears in UTF-8
        let bytes = [b'o', b'k', 0xFF];

        // Act
        let text = decode_payload(&bytes);

        // Assert
        assert_eq!(text, "ok\u{FFFD}");
    }

    #[test]
    fn test_decode_split_multibyte_sequence_is_not_reassembled() {
        // "é" is 0xC3 0xA9. A chunk boundary between them is decoded per chunk.
        assert_eq!(decode_payload(&[0xC3]), "\u{FFFD}");
        assert_eq!(decode_payload(&[0xA9]), "\u{FFFD}");
    }

    // ── diagnostic_text ───────────────────────────────────────────────────────

    #[test]
    fn test_diagnostic_for_connect_error_names_backend() {
        // Arrange
        let err = BridgeError::Connect {
            addr: "127.0.0.1:12345".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        };

        // Act
        let text = diagnostic_text(&err);

        // Assert
        assert!(text.starts_with(DIAGNOSTIC_PREFIX));
        assert!(text.contains("127.0.0.1:12345"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_diagnostic_for_read_error() {
        let err = BridgeError::Read(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(diagnostic_text(&err), "[Bridge] TCP error: read failed: reset");
    }

    #[test]
    fn test_diagnostic_for_write_error() {
        let err = BridgeError::Write(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        assert_eq!(
            diagnostic_text(&err),
            "[Bridge] TCP error: write failed: broken pipe"
        );
    }

    // ── PendingLines ──────────────────────────────────────────────────────────

    #[test]
    fn test_pending_drains_in_arrival_order() {
        // Arrange
        let mut pending = PendingLines::new(4);
        pending.push("a\n".to_string());
        pending.push("b\n".to_string());
        pending.push("c\n".to_string());

        // Act
        let drained: Vec<String> = pending.drain().collect();

        // Assert
        assert_eq!(drained, vec!["a\n", "b\n", "c\n"]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_pending_rejects_lines_past_the_limit() {
        // Arrange
        let mut pending = PendingLines::new(2);

        // Act
        let first = pending.push("1\n".to_string());
        let second = pending.push("2\n".to_string());
        let third = pending.push("3\n".to_string());

        // Assert: the oldest lines win; the overflow is counted
        assert!(first && second);
        assert!(!third);
        assert_eq!(pending.len(), 2);
        assert_eq!(pending.dropped(), 1);
        assert_eq!(pending.drain().collect::<Vec<_>>(), vec!["1\n", "2\n"]);
    }

    #[test]
    fn test_pending_zero_limit_drops_everything() {
        let mut pending = PendingLines::new(0);
        assert!(!pending.push("x\n".to_string()));
        assert!(pending.is_empty());
        assert_eq!(pending.dropped(), 1);
    }

    #[test]
    fn test_pending_accepts_again_after_drain() {
        let mut pending = PendingLines::new(1);
        assert!(pending.push("a\n".to_string()));
        let _ = pending.drain().count();
        assert!(pending.push("b\n".to_string()));
        assert_eq!(pending.len(), 1);
    }
}
