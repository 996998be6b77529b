//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{auth::AuthGate, hub::RoomHandle};

use super::{
    handler::{chat_handler, health_check},
    signal::shutdown_signal,
    state::AppState,
};

/// The WebSocket chat server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(room, auth, 256);
/// server.run("127.0.0.1".to_string(), 8180).await?;
/// ```
pub struct Server {
    room: RoomHandle,
    auth: Arc<dyn AuthGate>,
    outbound_queue_capacity: usize,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `room` - Handle into the room actor's mailboxes
    /// * `auth` - Auth gate consulted before any upgrade
    /// * `outbound_queue_capacity` - Per-connection outbound queue size
    pub fn new(room: RoomHandle, auth: Arc<dyn AuthGate>, outbound_queue_capacity: usize) -> Self {
        Self {
            room,
            auth,
            outbound_queue_capacity,
        }
    }

    /// Build the router. Exposed so the integration tests can serve it
    /// on an ephemeral port.
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            room: self.room.clone(),
            auth: self.auth.clone(),
            outbound_queue_capacity: self.outbound_queue_capacity,
        });

        Router::new()
            .route("/chat", get(chat_handler))
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the chat server until a shutdown signal arrives.
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8180)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified
    /// address or if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();

        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!("chat server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/chat", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
