pub mod handlers;
pub mod models;

use anyhow::{Context, Result};
use axum::{http::Method, routing::get, Router};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::relay::Relay;

/// Relay server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
}

/// Relay server instance
pub struct RelayServer {
    config: RelayConfig,
    relay: Relay,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            relay: Relay::new(),
        }
    }

    /// Bind and serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        tracing::info!("Chat relay listening on {}", addr);
        tracing::info!(
            "Heartbeat period: {}s",
            self.config.heartbeat_interval.as_secs()
        );

        let shutdown = CancellationToken::new();
        let ctrl_c = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
            }
            ctrl_c.cancel();
        });

        serve(
            listener,
            self.relay,
            self.config.heartbeat_interval,
            shutdown,
        )
        .await
    }
}

/// Serve the relay on an already-bound listener until `shutdown` is
/// cancelled, then terminate every live connection and stop the heartbeat.
pub async fn serve(
    listener: TcpListener,
    relay: Relay,
    heartbeat_interval: Duration,
    shutdown: CancellationToken,
) -> Result<()> {
    let heartbeat = relay
        .heartbeat(heartbeat_interval)
        .spawn(shutdown.child_token());

    let app = create_router(AppState {
        relay: relay.clone(),
    });

    let signal = {
        let shutdown = shutdown.clone();
        let relay = relay.clone();
        async move {
            shutdown.cancelled().await;
            let closed = relay.terminate_all().await;
            tracing::info!("Closing {} connection(s)", closed);
        }
    };

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .context("Server error");

    shutdown.cancel();
    if let Err(e) = heartbeat.await {
        tracing::warn!("Heartbeat monitor ended abnormally: {}", e);
    }
    tracing::info!("Chat relay stopped");

    result
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::banner_handler))
        .route("/ws", get(handlers::websocket_handler))
        .route("/status", get(handlers::status_handler))
        .route("/clients", get(handlers::clients_handler))
        .route("/health", get(handlers::health_handler))
        .fallback(handlers::not_found_handler)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET])
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
