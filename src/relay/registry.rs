//! Connection registry
//!
//! The registry is the single source of truth for which connections are
//! currently addressable. Structural changes take the write lock; lookups and
//! snapshots share the read lock. Iteration always runs over a snapshot taken
//! under the read lock, so callbacks are free to mutate the registry.

use axum::extract::ws::Message as WsMessage;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::protocol::Message;
use crate::error::{RelayError, Result};

/// One live relay session
#[derive(Debug)]
pub struct Connection {
    pub id: Uuid,
    tx: mpsc::UnboundedSender<WsMessage>,
    alive: AtomicBool,
    cancel: CancellationToken,
    pub connected_at: chrono::DateTime<chrono::Utc>,
}

impl Connection {
    pub fn new(id: Uuid, tx: mpsc::UnboundedSender<WsMessage>) -> Self {
        Self {
            id,
            tx,
            alive: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            connected_at: chrono::Utc::now(),
        }
    }

    /// Queue a raw frame for the connection's writer task.
    ///
    /// Fails once the writer has gone away or the connection was terminated.
    pub fn send_frame(&self, frame: WsMessage) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RelayError::TransportFailure(self.id));
        }
        self.tx
            .send(frame)
            .map_err(|_| RelayError::TransportFailure(self.id))
    }

    pub fn send(&self, message: &Message) -> Result<()> {
        let text = message.to_json()?;
        self.send_frame(WsMessage::Text(text))
    }

    /// Transport-level liveness probe (not a protocol `ping` message)
    pub fn probe(&self) -> Result<()> {
        self.send_frame(WsMessage::Ping(Vec::new()))
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// Clear the liveness flag, returning whether it was set.
    pub fn take_alive(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }

    /// Forcibly end the session. The lifecycle task observes this through
    /// [`Connection::terminated`] and tears the socket down.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }

    pub fn is_terminated(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn terminated(&self) {
        self.cancel.cancelled().await
    }
}

/// Shared map from connection id to connection, in connect order
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<IndexMap<Uuid, Arc<Connection>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, conn: Arc<Connection>) -> Result<()> {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&conn.id) {
            return Err(RelayError::DuplicateId(conn.id));
        }
        connections.insert(conn.id, conn);
        Ok(())
    }

    /// Remove a connection. Removing an absent id is a no-op, so concurrent
    /// close and eviction paths can both call this safely; only one of them
    /// gets the entry back.
    pub async fn remove(&self, id: &Uuid) -> Option<Arc<Connection>> {
        self.connections.write().await.shift_remove(id)
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<Connection>> {
        self.connections.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &Uuid) -> bool {
        self.connections.read().await.contains_key(id)
    }

    /// Copy of all current entries
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Call `f` for every connection other than `id`, returning how many were visited.
    pub async fn for_each_except<F>(&self, id: &Uuid, mut f: F) -> usize
    where
        F: FnMut(&Arc<Connection>),
    {
        let others: Vec<Arc<Connection>> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|conn| conn.id != *id)
            .collect();
        for conn in &others {
            f(conn);
        }
        others.len()
    }

    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn ids(&self) -> Vec<Uuid> {
        self.connections.read().await.keys().copied().collect()
    }
}
