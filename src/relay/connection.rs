//! Per-connection lifecycle
//!
//! `Connecting → Open → Closing → Closed`. A writer task drains the
//! connection's outbound channel into the socket while the read loop parses
//! inbound frames and hands them to the router. The loop ends on peer close,
//! read error, writer failure, or termination (heartbeat eviction, shutdown);
//! deregistration always runs after it, whichever trigger won.

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use super::protocol::{parse_frame, Message};
use super::registry::{Connection, ConnectionRegistry};
use super::Relay;

/// How long a closing connection may spend flushing queued frames
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    fn advance(&mut self, id: Uuid, next: ConnectionState) {
        let previous = *self;
        tracing::trace!(connection_id = %id, from = ?previous, to = ?next, "Connection state change");
        *self = next;
    }
}

/// Removes the connection from the registry when dropped, unless
/// [`Deregistration::run`] already did so. Covers exits by panic or
/// cancellation of the connection task.
struct Deregistration {
    registry: ConnectionRegistry,
    id: Uuid,
    armed: bool,
}

impl Deregistration {
    fn new(registry: ConnectionRegistry, id: Uuid) -> Self {
        Self {
            registry,
            id,
            armed: true,
        }
    }

    async fn run(mut self) {
        self.armed = false;
        if self.registry.remove(&self.id).await.is_some() {
            crate::log_connection_event!("disconnected", self.id);
        } else {
            tracing::debug!(connection_id = %self.id, "Connection already deregistered");
        }
    }
}

impl Drop for Deregistration {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let registry = self.registry.clone();
        let id = self.id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                registry.remove(&id).await;
            });
        }
    }
}

pub async fn handle_socket(socket: WebSocket, relay: Relay) {
    let (sink, stream) = socket.split();
    run_connection(sink, stream, relay).await;
}

/// Drive one connection from accept to close.
pub async fn run_connection<Si, St, E>(mut sink: Si, mut stream: St, relay: Relay)
where
    Si: Sink<WsMessage> + Send + Unpin + 'static,
    St: Stream<Item = Result<WsMessage, E>> + Unpin,
    E: Display,
{
    let id = Uuid::new_v4();
    let mut state = ConnectionState::Connecting;
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let conn = Arc::new(Connection::new(id, tx));

    // Queued before registration so no relayed frame can overtake it.
    if let Err(e) = conn.send(&Message::joined(id)) {
        tracing::debug!("Join acknowledgment not queued: {}", e);
    }
    if let Err(e) = relay.registry().add(conn.clone()).await {
        crate::log_error!(e, "connection registration");
        return;
    }
    let deregistration = Deregistration::new(relay.registry().clone(), id);

    let writer_conn = conn.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(frame) => {
                        if sink.send(frame).await.is_err() {
                            return;
                        }
                    }
                    None => break,
                },
                _ = writer_conn.terminated() => {
                    rx.close();
                    while let Some(frame) = rx.recv().await {
                        if sink.send(frame).await.is_err() {
                            return;
                        }
                    }
                    break;
                }
            }
        }
        let _ = sink.close().await;
    });

    state.advance(id, ConnectionState::Open);
    crate::log_connection_event!("connected", id);

    let mut writer_done = false;
    loop {
        tokio::select! {
            _ = conn.terminated() => {
                tracing::debug!(connection_id = %id, "Connection terminated");
                break;
            }
            _ = &mut send_task => {
                tracing::debug!(connection_id = %id, "Writer closed");
                writer_done = true;
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => handle_text(&relay, &conn, &text).await,
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => handle_text(&relay, &conn, &text).await,
                    Err(_) => reject_frame(&conn, "binary frame is not valid UTF-8"),
                },
                Some(Ok(WsMessage::Pong(_))) => {
                    tracing::trace!(connection_id = %id, "Received pong");
                    conn.mark_alive();
                }
                Some(Ok(WsMessage::Ping(_))) => {}
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %id, "WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    }

    state.advance(id, ConnectionState::Closing);
    deregistration.run().await;
    // The writer flushes what is queued, then closes the sink.
    conn.terminate();
    if !writer_done && timeout(WRITER_FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        tracing::debug!(connection_id = %id, "Writer flush timed out");
        send_task.abort();
    }
    state.advance(id, ConnectionState::Closed);
}

async fn handle_text(relay: &Relay, conn: &Arc<Connection>, text: &str) {
    match parse_frame(text) {
        Ok(message) => {
            relay.router().route(conn.id, message).await;
        },
        Err(e) => reject_frame(conn, e),
    }
}

fn reject_frame(conn: &Connection, reason: impl Display) {
    tracing::warn!(connection_id = %conn.id, "Invalid message format: {}", reason);
    if let Err(e) = conn.send(&Message::invalid_format()) {
        tracing::debug!("Error reply not delivered: {}", e);
    }
}
