//! Real-time connection and message relay
//!
//! [`Relay`] bundles the shared registry with the router and status view built
//! on top of it. Cloning is cheap; every clone sees the same registry.

pub mod connection;
pub mod heartbeat;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod status;

use std::time::Duration;

use heartbeat::HeartbeatMonitor;
use registry::ConnectionRegistry;
use router::MessageRouter;
use status::StatusQuery;

#[derive(Debug, Clone)]
pub struct Relay {
    registry: ConnectionRegistry,
    router: MessageRouter,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    pub fn new() -> Self {
        let registry = ConnectionRegistry::new();
        Self {
            router: MessageRouter::new(registry.clone()),
            registry,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn status(&self) -> StatusQuery {
        StatusQuery::new(self.registry.clone())
    }

    pub fn heartbeat(&self, period: Duration) -> HeartbeatMonitor {
        HeartbeatMonitor::new(self.registry.clone(), period)
    }

    /// Terminate every live connection. Each session deregisters itself as
    /// its task winds down.
    pub async fn terminate_all(&self) -> usize {
        let connections = self.registry.snapshot().await;
        for conn in &connections {
            conn.terminate();
        }
        connections.len()
    }
}
