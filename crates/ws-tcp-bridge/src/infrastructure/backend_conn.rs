//! TCP connection management for the backend.
//!
//! Each client WebSocket session gets its own TCP connection to the backend.
//! The backend treats the bridge as just another line-oriented TCP client.
//!
//! # Streaming without reassembly
//!
//! TCP is a stream protocol: a single `read()` may return part of a backend
//! line or several lines at once. The bridge deliberately does not reassemble
//! lines. Every successful read becomes exactly one [`BackendEvent::Chunk`],
//! and so exactly one WebSocket message.
//!
//! The reader and writer are generic over `AsyncRead` / `AsyncWrite` so the
//! tests can drive them with scripted mocks instead of real sockets.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::BridgeError;

/// Size of the buffer handed to each `read()` on the backend socket.
const READ_BUF_SIZE: usize = 4096;

/// Something that happened on the backend side of a session.
#[derive(Debug)]
pub enum BackendEvent {
    /// Bytes from one backend read, forwarded as one WebSocket message.
    Chunk(Vec<u8>),

    /// The backend closed the connection cleanly (EOF).
    Closed,

    /// The backend connection failed.
    Failed(BridgeError),
}

/// An established TCP connection to the backend, split into owned halves so
/// each direction of the relay can run in its own task.
pub struct BackendConnection {
    /// Read half of the backend TCP stream.
    pub read_half: OwnedReadHalf,
    /// Write half of the backend TCP stream.
    pub write_half: OwnedWriteHalf,
}

impl BackendConnection {
    /// Opens a new TCP connection to `host:port` with `TCP_NODELAY` set.
    ///
    /// The relay is interactive, so small writes go out immediately instead
    /// of being coalesced by Nagle's algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connect`] if the host cannot be resolved or
    /// reached, or if the socket option cannot be applied.
    pub async fn connect(host: &str, port: u16) -> Result<Self, BridgeError> {
        let addr = format!("{host}:{port}");

        let stream = match TcpStream::connect((host, port)).await {
            Ok(stream) => stream,
            Err(source) => return Err(BridgeError::Connect { addr, source }),
        };

        if let Err(source) = stream.set_nodelay(true) {
            return Err(BridgeError::Connect { addr, source });
        }

        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            read_half,
            write_half,
        })
    }
}

// ── Backend reader ────────────────────────────────────────────────────────────

/// Reads from the backend until EOF or error, reporting each read to `tx`.
///
/// Ends with exactly one [`BackendEvent::Closed`] or
/// [`BackendEvent::Failed`], unless the receiver is dropped first (the
/// session is over and nobody is listening).
pub async fn read_backend_chunks<R>(mut reader: R, session_id: &str, tx: mpsc::Sender<BackendEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let event = match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("session {session_id}: backend TCP connection closed (EOF)");
                let _ = tx.send(BackendEvent::Closed).await;
                return;
            }
            Ok(n) => BackendEvent::Chunk(buf[..n].to_vec()),
            Err(e) => {
                debug!("session {session_id}: read from backend failed: {e}");
                let _ = tx.send(BackendEvent::Failed(BridgeError::Read(e))).await;
                return;
            }
        };

        if tx.send(event).await.is_err() {
            debug!("session {session_id}: backend event channel closed; exiting reader");
            return;
        }
    }
}

// ── Backend writer ────────────────────────────────────────────────────────────

/// Writes one framed line to the backend.
///
/// # Errors
///
/// Returns [`BridgeError::Write`] if the write fails (e.g. the backend reset
/// the connection).
pub async fn write_line<W>(writer: &mut W, line: &str, session_id: &str) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
{
    // `write_all` loops over partial writes; a line is never half-sent on success.
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(BridgeError::Write)?;
    debug!("session {session_id}: client → backend: {} bytes", line.len());
    Ok(())
}

/// Half-closes the backend connection (TCP FIN).
///
/// Lines already accepted by [`write_line`] are delivered before the FIN.
/// A failure here only means the connection is already gone.
pub async fn shutdown_backend<W>(writer: &mut W, session_id: &str)
where
    W: AsyncWrite + Unpin,
{
    match writer.shutdown().await {
        Ok(()) => debug!("session {session_id}: backend write side shut down"),
        Err(e) => debug!("session {session_id}: backend shutdown failed: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
