use serde::{Deserialize, Serialize};

use super::registry::ConnectionRegistry;

pub const RUNNING_STATUS: &str = "WebSocket server is running";

/// `GET /status` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub connected_clients: usize,
}

/// `GET /clients` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientsResponse {
    pub clients: Vec<String>,
    pub count: usize,
}

/// Read-only view over the registry for the HTTP control surface
#[derive(Debug, Clone)]
pub struct StatusQuery {
    registry: ConnectionRegistry,
}

impl StatusQuery {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub async fn status(&self) -> StatusResponse {
        StatusResponse {
            status: RUNNING_STATUS.to_string(),
            connected_clients: self.registry.count().await,
        }
    }

    pub async fn clients(&self) -> ClientsResponse {
        let clients: Vec<String> = self
            .registry
            .ids()
            .await
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        ClientsResponse {
            count: clients.len(),
            clients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::registry::Connection;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_empty_registry() {
        let query = StatusQuery::new(ConnectionRegistry::new());
        let status = query.status().await;
        assert_eq!(status.status, RUNNING_STATUS);
        assert_eq!(status.connected_clients, 0);

        let clients = query.clients().await;
        assert!(clients.clients.is_empty());
        assert_eq!(clients.count, 0);
    }

    #[tokio::test]
    async fn test_reports_registered_ids() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        registry.add(Arc::new(Connection::new(id, tx))).await.unwrap();

        let query = StatusQuery::new(registry);
        assert_eq!(query.status().await.connected_clients, 1);
        assert_eq!(query.clients().await.clients, vec![id.to_string()]);
    }

    #[test]
    fn test_status_uses_camel_case() {
        let json = serde_json::to_string(&StatusResponse {
            status: RUNNING_STATUS.to_string(),
            connected_clients: 2,
        })
        .unwrap();
        assert!(json.contains("\"connectedClients\":2"));
    }
}
