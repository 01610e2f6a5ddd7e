//! Per-session relay between one client WebSocket and one backend TCP
//! connection.
//!
//! # Lifecycle
//!
//! 1. **Connecting**: the backend connect starts as soon as the upgrade
//!    completes. Client messages that arrive meanwhile are framed and queued
//!    in a bounded [`PendingLines`]. If the client leaves first, the connect is
//!    abandoned. If the connect fails, the client gets one diagnostic and a
//!    close frame.
//! 2. **Relaying**: three tasks run concurrently:
//!    - backend reader: TCP reads → [`BackendEvent`]s
//!    - backend → client: events → text frames (or diagnostic + close)
//!    - client → backend: flushes the queue, then frames → lines
//! 3. **Teardown**: the session ends when either client-facing task
//!    finishes. The remaining tasks are aborted, which drops both sockets.
//!    A backend write failure is the exception: the backend → client task
//!    is left to deliver the diagnostic and close frame first.
//!
//! A client close half-closes the backend (FIN) before teardown. A backend
//! EOF sends a normal close frame to the client.

use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::{
    decode_payload, diagnostic_text, frame_for_backend, BridgeError, PendingLines,
};
use crate::domain::{BridgeConfig, ClientFrame, CloseReason};
use crate::infrastructure::backend_conn::{
    read_backend_chunks, shutdown_backend, write_line, BackendConnection, BackendEvent,
};

/// Capacity of the backend → client event channel.
const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Outcome of the connecting phase.
enum Connecting<C> {
    /// Backend connected; carries the lines queued meanwhile.
    Ready(C, PendingLines),
    /// The client closed or errored before the backend answered.
    ClientGone,
    /// The backend connect failed.
    Failed(BridgeError),
}

/// How the client → backend direction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientOutcome {
    /// The client closed the WebSocket or its stream ended.
    ClientClosed,
    /// A backend write failed. The failure is queued for the backend → client
    /// task, which still has to deliver it.
    BackendFailed,
}

// ── Session entry point ───────────────────────────────────────────────────────

/// Runs one session from upgrade to teardown.
///
/// Never returns an error: every failure is either reported to the client or
/// simply ends the session.
pub async fn run_session(socket: WebSocket, peer: SocketAddr, config: Arc<BridgeConfig>) {
    let session_id = peer.to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let connect = BackendConnection::connect(&config.backend_host, config.backend_port);
    let (conn, pending) =
        match connect_while_buffering(&mut ws_rx, connect, config.pending_limit, &session_id).await
        {
            Connecting::Ready(conn, pending) => (conn, pending),
            Connecting::ClientGone => {
                info!("session {session_id}: client left before the backend connected");
                return;
            }
            Connecting::Failed(err) => {
                warn!("session {session_id}: {err}");
                report_failure(&mut ws_tx, &err).await;
                return;
            }
        };

    info!(
        "session {session_id}: connected to backend at {} ({} queued)",
        config.backend_addr(),
        pending.len()
    );

    let BackendConnection {
        read_half,
        write_half,
    } = conn;
    let (event_tx, event_rx) = mpsc::channel::<BackendEvent>(EVENT_CHANNEL_CAPACITY);

    // ── Task A: backend reader ────────────────────────────────────────────────
    let reader_tx = event_tx.clone();
    let reader_id = session_id.clone();
    let backend_reader = tokio::spawn(async move {
        read_backend_chunks(read_half, &reader_id, reader_tx).await;
    });

    // ── Task B: backend → client ──────────────────────────────────────────────
    let to_client = tokio::spawn(backend_to_client(ws_tx, event_rx, session_id.clone()));

    // ── Task C: client → backend ──────────────────────────────────────────────
    let to_backend = tokio::spawn(client_to_backend(
        ws_rx,
        write_half,
        pending,
        event_tx,
        session_id.clone(),
    ));

    await_teardown(to_client, to_backend, &session_id).await;
    backend_reader.abort();

    info!("session {session_id}: closed");
}

/// Waits for the first client-facing task to end, then aborts the other.
///
/// After a backend write failure the backend → client task is awaited
/// instead: it owns the client sink and must send the diagnostic and the
/// close frame. It ends as soon as it reaches the queued failure.
async fn await_teardown(
    mut to_client: JoinHandle<()>,
    mut to_backend: JoinHandle<ClientOutcome>,
    session_id: &str,
) {
    tokio::select! {
        _ = &mut to_client => {
            debug!("session {session_id}: backend→client task ended");
        }
        outcome = &mut to_backend => {
            debug!("session {session_id}: client→backend task ended ({outcome:?})");
            if matches!(outcome, Ok(ClientOutcome::BackendFailed)) {
                let _ = (&mut to_client).await;
            }
        }
    }

    // Dropping a JoinHandle detaches the task; abort so neither socket
    // outlives the session.
    to_client.abort();
    to_backend.abort();
}

// ── Connecting phase ──────────────────────────────────────────────────────────

/// Drives `connect` to completion while queueing client messages.
///
/// The connect future is polled first on every iteration so a flood of
/// client messages cannot delay it.
async fn connect_while_buffering<S, E, F, C>(
    ws_rx: &mut S,
    connect: F,
    pending_limit: usize,
    session_id: &str,
) -> Connecting<C>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
    F: Future<Output = Result<C, BridgeError>>,
{
    tokio::pin!(connect);
    let mut pending = PendingLines::new(pending_limit);

    loop {
        tokio::select! {
            biased;

            result = &mut connect => {
                return match result {
                    Ok(conn) => Connecting::Ready(conn, pending),
                    Err(err) => Connecting::Failed(err),
                };
            }

            incoming = ws_rx.next() => {
                match next_frame(incoming, session_id) {
                    ClientFrame::Payload(text) => {
                        if !pending.push(frame_for_backend(&text)) {
                            warn!(
                                "session {session_id}: backend not connected yet; dropped message ({} dropped so far)",
                                pending.dropped()
                            );
                        }
                    }
                    ClientFrame::Control => {}
                    ClientFrame::Close => return Connecting::ClientGone,
                }
            }
        }
    }
}

// ── Relay directions ──────────────────────────────────────────────────────────

/// Forwards backend events to the client until the backend closes or fails,
/// or the client stops accepting frames.
async fn backend_to_client<S>(
    mut ws_tx: S,
    mut events: mpsc::Receiver<BackendEvent>,
    session_id: String,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(event) = events.recv().await {
        match event {
            BackendEvent::Chunk(bytes) => {
                let text = decode_payload(&bytes);
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    debug!("session {session_id}: WebSocket send failed (client disconnected): {e}");
                    return;
                }
            }
            BackendEvent::Closed => {
                info!("session {session_id}: backend closed the connection");
                if let Err(e) = close_client(&mut ws_tx, CloseReason::BackendClosed).await {
                    debug!("session {session_id}: close frame not delivered: {e}");
                }
                return;
            }
            BackendEvent::Failed(err) => {
                warn!("session {session_id}: {err}");
                report_failure(&mut ws_tx, &err).await;
                return;
            }
        }
    }
}

/// Writes queued lines, then every client message, to the backend.
///
/// Ends with a backend half-close when the client closes. A write failure is
/// handed to the backend → client task as [`BackendEvent::Failed`].
async fn client_to_backend<S, E, W>(
    mut ws_rx: S,
    mut writer: W,
    mut pending: PendingLines,
    events: mpsc::Sender<BackendEvent>,
    session_id: String,
) -> ClientOutcome
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
    W: AsyncWrite + Unpin,
{
    for line in pending.drain() {
        if let Err(err) = write_line(&mut writer, &line, &session_id).await {
            let _ = events.send(BackendEvent::Failed(err)).await;
            return ClientOutcome::BackendFailed;
        }
    }

    loop {
        match next_frame(ws_rx.next().await, &session_id) {
            ClientFrame::Payload(text) => {
                let line = frame_for_backend(&text);
                if let Err(err) = write_line(&mut writer, &line, &session_id).await {
                    let _ = events.send(BackendEvent::Failed(err)).await;
                    return ClientOutcome::BackendFailed;
                }
            }
            ClientFrame::Control => {}
            ClientFrame::Close => {
                debug!("session {session_id}: client closed the WebSocket");
                shutdown_backend(&mut writer, &session_id).await;
                return ClientOutcome::ClientClosed;
            }
        }
    }
}

// ── Client frames ─────────────────────────────────────────────────────────────

/// Classifies one WebSocket message for the relay.
pub fn client_frame(msg: Message) -> ClientFrame {
    match msg {
        Message::Text(text) => ClientFrame::Payload(text.as_str().to_owned()),
        Message::Binary(data) => ClientFrame::Payload(decode_payload(&data)),
        // axum answers pings itself.
        Message::Ping(_) | Message::Pong(_) => ClientFrame::Control,
        Message::Close(_) => ClientFrame::Close,
    }
}

/// Maps the next item of the client stream to a frame. A stream error or the
/// end of the stream counts as a close.
fn next_frame<E: Display>(incoming: Option<Result<Message, E>>, session_id: &str) -> ClientFrame {
    match incoming {
        Some(Ok(msg)) => client_frame(msg),
        Some(Err(e)) => {
            debug!("session {session_id}: WebSocket receive error: {e}");
            ClientFrame::Close
        }
        None => {
            debug!("session {session_id}: WebSocket stream ended");
            ClientFrame::Close
        }
    }
}

// ── Client notifications ──────────────────────────────────────────────────────

/// Sends the diagnostic text for `err` as one WebSocket text message.
///
/// # Errors
///
/// Returns the sink error if the client can no longer be reached.
pub async fn send_diagnostic<S>(ws_tx: &mut S, err: &BridgeError) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    ws_tx.send(Message::Text(diagnostic_text(err).into())).await
}

/// Sends a close frame carrying `reason`.
///
/// # Errors
///
/// Returns the sink error if the client can no longer be reached.
pub async fn close_client<S>(ws_tx: &mut S, reason: CloseReason) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    ws_tx
        .send(Message::Close(Some(CloseFrame {
            code: reason.code(),
            reason: Utf8Bytes::from_static(reason.reason()),
        })))
        .await
}

/// Reports a backend failure: one diagnostic message, then a close frame.
///
/// Both sends are best effort and their errors are discarded on purpose: the
/// client may already be gone, and the session is torn down either way.
pub async fn report_failure<S>(ws_tx: &mut S, err: &BridgeError)
where
    S: Sink<Message> + Unpin,
{
    let _ = send_diagnostic(ws_tx, err).await;
    let _ = close_client(ws_tx, CloseReason::BackendFailed).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
