//! Common utilities for integration tests
//!
//! Starts an in-process relay on an ephemeral port and provides a thin
//! WebSocket client that understands the relay's join handshake.

#![allow(dead_code)]

use chat_relay::relay::protocol::{Message, MessageType};
use chat_relay::relay::Relay;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);
pub const SILENCE_WINDOW: Duration = Duration::from_millis(300);

pub struct TestServer {
    pub addr: SocketAddr,
    pub relay: Relay,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_heartbeat(Duration::from_secs(30)).await
    }

    pub async fn start_with_heartbeat(heartbeat: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let relay = Relay::new();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(chat_relay::server::serve(
            listener,
            relay.clone(),
            heartbeat,
            shutdown.clone(),
        ));

        Self {
            addr,
            relay,
            shutdown,
            handle,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get_json(&self, path: &str) -> serde_json::Value {
        reqwest::get(self.http_url(path))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    pub async fn client_ids(&self) -> Vec<String> {
        let body = self.get_json("/clients").await;
        body["clients"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    /// Poll `/status` until the connected count matches or the timeout expires.
    pub async fn wait_for_count(&self, expected: u64) -> bool {
        let deadline = tokio::time::Instant::now() + FRAME_TIMEOUT;
        while tokio::time::Instant::now() < deadline {
            let body = self.get_json("/status").await;
            if body["connectedClients"].as_u64() == Some(expected) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        false
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        let result = tokio::time::timeout(FRAME_TIMEOUT, self.handle)
            .await
            .expect("server did not shut down")
            .unwrap();
        assert!(result.is_ok());
    }
}

pub struct TestClient {
    pub id: Uuid,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect and consume the join acknowledgment.
    pub async fn connect(server: &TestServer) -> Self {
        let (ws, _) = connect_async(server.ws_url()).await.unwrap();
        let mut client = Self { id: Uuid::nil(), ws };

        let join = client.next_message().await;
        assert_eq!(join.kind, MessageType::Join);
        assert_eq!(join.from.as_deref(), Some("server"));
        let content = join.content.expect("join carries the assigned id");
        client.id = content
            .strip_prefix("Connected with ID: ")
            .expect("join content format")
            .parse()
            .unwrap();
        client
    }

    pub async fn send_json(&mut self, value: serde_json::Value) {
        self.send_raw(&value.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(tungstenite::Message::Text(text.to_string()))
            .await
            .unwrap();
    }

    /// Next protocol message, skipping transport control frames.
    pub async fn next_message(&mut self) -> Message {
        tokio::time::timeout(FRAME_TIMEOUT, self.next_text())
            .await
            .expect("timed out waiting for message")
            .expect("connection closed")
    }

    /// Assert that no protocol message arrives within the silence window.
    pub async fn expect_silence(&mut self) {
        if let Ok(Some(message)) = tokio::time::timeout(SILENCE_WINDOW, self.next_text()).await {
            panic!("unexpected message: {:?}", message);
        }
    }

    async fn next_text(&mut self) -> Option<Message> {
        while let Some(frame) = self.ws.next().await {
            match frame {
                Ok(tungstenite::Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).unwrap());
                },
                Ok(tungstenite::Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
        None
    }

    /// Keep reading (and so answering liveness probes) until the server closes.
    pub async fn keep_alive(mut self) {
        while self.next_text().await.is_some() {}
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }

    /// Hand back the raw stream, e.g. to hold a connection open without reading.
    pub fn into_inner(self) -> WebSocketStream<MaybeTlsStream<TcpStream>> {
        self.ws
    }
}
