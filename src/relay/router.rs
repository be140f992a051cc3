//! Message dispatch policy
//!
//! Given the id of the connection a frame arrived on and the validated
//! message, decide who receives it:
//!
//! 1. Unknown sender (raced a concurrent close) → discard.
//! 2. `ping` → `pong` to the sender only.
//! 3. `message` → stamp `from`/`timestamp`, then unicast when `to` resolves to
//!    a registered connection, otherwise broadcast to everyone but the sender.
//!    An unresolvable `to` falls back to broadcast.
//! 4. `join`, `leave`, `pong` are server-asserted and ignored from clients.
//!
//! Every delivery is best-effort: a failed send to one recipient is logged and
//! dropped without affecting the others.

use std::sync::Arc;
use uuid::Uuid;

use super::protocol::{Message, MessageType};
use super::registry::{Connection, ConnectionRegistry};

/// What the router did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The sender is no longer registered
    Discarded,
    /// A pong was queued for the sender
    Pong,
    /// Delivered only to the resolved recipient
    Unicast(Uuid),
    /// Fanned out to every other connection
    Broadcast { delivered: usize },
    /// A server-asserted type sent by a client
    Ignored(MessageType),
}

#[derive(Debug, Clone)]
pub struct MessageRouter {
    registry: ConnectionRegistry,
}

impl MessageRouter {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub async fn route(&self, sender_id: Uuid, message: Message) -> RouteOutcome {
        let Some(sender) = self.registry.get(&sender_id).await else {
            tracing::debug!(sender = %sender_id, "Dropping message from unregistered sender");
            return RouteOutcome::Discarded;
        };

        match message.kind {
            MessageType::Ping => {
                deliver(&sender, &Message::pong());
                RouteOutcome::Pong
            },
            MessageType::Message => {
                let relayed = message.relayed(sender_id);

                if let Some(to) = relayed.to {
                    if let Some(recipient) = self.registry.get(&to).await {
                        deliver(&recipient, &relayed);
                        tracing::debug!(from = %sender_id, to = %to, "Direct message relayed");
                        return RouteOutcome::Unicast(to);
                    }
                    tracing::debug!(
                        from = %sender_id,
                        to = %to,
                        "Recipient not connected, falling back to broadcast"
                    );
                }

                self.broadcast(sender_id, &relayed).await
            },
            other => {
                tracing::debug!(
                    sender = %sender_id,
                    message_type = %other,
                    "Ignoring server-asserted message type from client"
                );
                RouteOutcome::Ignored(other)
            },
        }
    }

    async fn broadcast(&self, sender_id: Uuid, message: &Message) -> RouteOutcome {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to serialize broadcast message: {}", e);
                return RouteOutcome::Broadcast { delivered: 0 };
            },
        };

        let mut delivered = 0;
        self.registry
            .for_each_except(&sender_id, |conn| {
                match conn.send_frame(axum::extract::ws::Message::Text(text.clone())) {
                    Ok(()) => delivered += 1,
                    Err(e) => tracing::debug!("Broadcast delivery dropped: {}", e),
                }
            })
            .await;

        tracing::debug!(from = %sender_id, delivered, "Message broadcast");
        RouteOutcome::Broadcast { delivered }
    }
}

fn deliver(conn: &Arc<Connection>, message: &Message) {
    if let Err(e) = conn.send(message) {
        tracing::debug!("Delivery dropped: {}", e);
    }
}
