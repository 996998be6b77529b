//! WebSocket and HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, ws::WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tokio::sync::mpsc;

use crate::hub::{ClientHandle, pump};

use super::state::AppState;

/// Upgrade endpoint for the chat room.
///
/// The auth gate runs before the upgrade is accepted: a rejected
/// caller gets an unauthorized response and no room state is touched.
pub async fn chat_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let identity = match state.auth.authenticate(&headers) {
        Ok(identity) => identity,
        Err(error) => {
            tracing::warn!(%error, "rejecting unauthenticated upgrade");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    let (outbound_tx, outbound_rx) = mpsc::channel(state.outbound_queue_capacity);
    let client = ClientHandle::new(identity.user_id, outbound_tx);
    let room = state.room.clone();

    tracing::info!(conn_id = %client.conn_id, user_id = %client.user_id, "upgrading connection");
    Ok(ws.on_upgrade(move |socket| pump::run(socket, room, client, outbound_rx)))
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
