//! Per-connection pump: bridges one WebSocket to the room actor.
//!
//! Two loops per connection. The reader validates inbound frames and
//! submits them to the `forward` mailbox; the writer drains the
//! connection's outbound queue onto the socket. Exactly one `Leave` is
//! submitted per connection, no matter which loop exits first or why.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::sync::mpsc;

use super::{
    client::{ClientHandle, ConnId},
    room::RoomHandle,
};

/// Connection lifecycle. Transitions only ever move forward
/// (`Connecting → Joined → Leaving → Closed`); `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpState {
    Connecting,
    Joined,
    Leaving,
    Closed,
}

/// Drive one connection until it is fully torn down.
///
/// `outbound_rx` is the receiving half of the client's bounded queue;
/// the actor holds the sending half inside `client` once it is joined,
/// so the queue closing is the signal that the room let this
/// connection go.
pub async fn run(
    socket: WebSocket,
    room: RoomHandle,
    client: ClientHandle,
    outbound_rx: mpsc::Receiver<String>,
) {
    let conn_id = client.conn_id;
    let user_id = client.user_id.clone();
    let mut state = PumpState::Connecting;
    tracing::debug!(%conn_id, %user_id, ?state, "pump starting");

    if room.join(client).await.is_err() {
        tracing::warn!(%conn_id, "room actor gone, dropping connection");
        return;
    }
    state = PumpState::Joined;
    tracing::debug!(%conn_id, ?state, "registered with room");

    let (sink, stream) = socket.split();
    let mut reader = tokio::spawn(reader_loop(stream, room.clone(), conn_id));
    let mut writer = tokio::spawn(writer_loop(outbound_rx, sink, conn_id));

    tokio::select! {
        _ = &mut reader => {
            state = PumpState::Leaving;
            tracing::debug!(%conn_id, ?state, "reader exited");
            let _ = room.leave(conn_id).await;
            // The leave drops our outbound sender; the writer drains
            // whatever is still queued, observes the close, and exits.
            let _ = writer.await;
        }
        _ = &mut writer => {
            state = PumpState::Leaving;
            tracing::debug!(%conn_id, ?state, "writer exited");
            // The socket is unusable for writes; a read may still be
            // parked, so cancel it rather than wait for the peer.
            reader.abort();
            let _ = room.leave(conn_id).await;
        }
    }

    state = PumpState::Closed;
    tracing::debug!(%conn_id, %user_id, ?state, "connection closed");
}

/// Read frames until the socket errors or the peer closes.
///
/// Inbound text frames are only decoded far enough to confirm they are
/// well-formed structured data, then re-encoded to canonical bytes and
/// submitted. A malformed frame costs that frame, not the connection.
async fn reader_loop(mut stream: SplitStream<WebSocket>, room: RoomHandle, conn_id: ConnId) {
    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(%conn_id, %error, "socket read failed");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                let value = match serde_json::from_str::<serde_json::Value>(text.as_str()) {
                    Ok(value) => value,
                    Err(error) => {
                        tracing::warn!(%conn_id, %error, "dropping malformed inbound frame");
                        continue;
                    }
                };
                let canonical = match serde_json::to_string(&value) {
                    Ok(canonical) => canonical,
                    Err(error) => {
                        tracing::warn!(%conn_id, %error, "dropping unencodable inbound frame");
                        continue;
                    }
                };
                if room.forward(canonical).await.is_err() {
                    break;
                }
            }
            Message::Binary(_) => {
                tracing::warn!(%conn_id, "dropping binary frame");
            }
            Message::Close(_) => {
                tracing::debug!(%conn_id, "peer requested close");
                break;
            }
            // Ping/pong is answered by the websocket layer itself.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Write queued frames until the queue closes or a write fails.
async fn writer_loop(
    mut outbound_rx: mpsc::Receiver<String>,
    mut sink: SplitSink<WebSocket, Message>,
    conn_id: ConnId,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(error) = sink.send(Message::Text(frame.into())).await {
            tracing::debug!(%conn_id, %error, "socket write failed");
            break;
        }
    }
}
