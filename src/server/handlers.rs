use axum::{
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use super::models::{ApiError, BannerResponse, HealthResponse};
use super::AppState;
use crate::relay::connection::handle_socket;
use crate::relay::status::{ClientsResponse, StatusResponse};

/// Upgrade to a relay WebSocket session
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let relay = state.relay.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

/// GET /status
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.relay.status().status().await)
}

/// GET /clients
pub async fn clients_handler(State(state): State<AppState>) -> Json<ClientsResponse> {
    Json(state.relay.status().clients().await)
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "chat-relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn banner_handler() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "Chat relay: connect a WebSocket client to /ws".to_string(),
    })
}

pub async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            error: "Not found".to_string(),
            code: "NOT_FOUND".to_string(),
        }),
    )
}
