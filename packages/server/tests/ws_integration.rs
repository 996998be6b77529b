//! End-to-end tests over real WebSocket connections.
//!
//! Each test serves the real router on an ephemeral port and drives it
//! with raw WebSocket clients carrying the identity cookie.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message, client::IntoClientRequest, http::HeaderValue},
};

use irori_server::{
    auth::CookieAuthGate,
    history::InMemoryHistoryStore,
    hub::{OverflowPolicy, RoomActor, RoomConfig},
    ui::Server,
};
use irori_shared::envelope::{ChatPayload, Envelope};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Serve the full stack on an ephemeral port; returns the bound address.
async fn start_server() -> SocketAddr {
    let store = Arc::new(InMemoryHistoryStore::new());
    let config = RoomConfig {
        room_name: "main".to_string(),
        overflow_policy: OverflowPolicy::DropNewest,
        history_timeout: Duration::from_secs(1),
    };
    let (actor, room) = RoomActor::new(config, store);
    tokio::spawn(actor.run());

    let server = Server::new(room, Arc::new(CookieAuthGate::new("auth")), 256);
    let app = server.router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, user_id: &str) -> WsClient {
    let mut request = format!("ws://{addr}/chat").into_client_request().unwrap();
    request.headers_mut().insert(
        "Cookie",
        HeaderValue::from_str(&format!("auth={user_id}")).unwrap(),
    );
    let (client, _response) = connect_async(request).await.unwrap();
    client
}

async fn recv_envelope(client: &mut WsClient) -> Envelope {
    loop {
        let message = tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection ended unexpectedly")
            .expect("socket read failed");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("frame is a valid envelope");
        }
    }
}

fn chat_message(user_id: &str, message: &str) -> Message {
    let envelope = Envelope::Chat(ChatPayload {
        room_name: "main".to_string(),
        user_id: user_id.to_string(),
        message: message.to_string(),
    });
    Message::Text(serde_json::to_string(&envelope).unwrap().into())
}

/// Drain the three frames a join delivers to the joiner itself.
async fn drain_join_frames(client: &mut WsClient) {
    for _ in 0..3 {
        recv_envelope(client).await;
    }
}

#[tokio::test]
async fn test_upgrade_without_cookie_is_rejected() {
    // given: a running server
    let addr = start_server().await;

    // when: a client attempts the upgrade with no credentials
    let request = format!("ws://{addr}/chat").into_client_request().unwrap();
    let result = connect_async(request).await;

    // then: the handshake is refused with 401 before any upgrade
    match result {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected an HTTP 401 rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_replays_history_then_user_list() {
    // given: a running server with an empty room
    let addr = start_server().await;

    // when: alice connects
    let mut alice = connect(addr, "alice").await;

    // then: she receives an empty history first, then the user list
    assert_eq!(
        recv_envelope(&mut alice).await,
        Envelope::ChatHistory { entries: vec![] }
    );
    assert_eq!(
        recv_envelope(&mut alice).await,
        Envelope::UserList {
            users: vec!["alice".to_string()]
        }
    );
}

#[tokio::test]
async fn test_second_join_notifies_everyone() {
    // given: alice already connected
    let addr = start_server().await;
    let mut alice = connect(addr, "alice").await;
    drain_join_frames(&mut alice).await;

    // when: bob connects
    let mut bob = connect(addr, "bob").await;

    // then: bob gets his (still empty) history, and both see the
    // updated user list and the join notice
    assert_eq!(
        recv_envelope(&mut bob).await,
        Envelope::ChatHistory { entries: vec![] }
    );
    let expected_users = Envelope::UserList {
        users: vec!["alice".to_string(), "bob".to_string()],
    };
    assert_eq!(recv_envelope(&mut bob).await, expected_users);
    assert_eq!(recv_envelope(&mut alice).await, expected_users);
    let expected_notice = Envelope::System {
        message: "bob joined".to_string(),
    };
    assert_eq!(recv_envelope(&mut bob).await, expected_notice);
    assert_eq!(recv_envelope(&mut alice).await, expected_notice);
}

#[tokio::test]
async fn test_chat_fans_out_to_all_including_sender() {
    // given: alice and bob connected, join traffic drained
    let addr = start_server().await;
    let mut alice = connect(addr, "alice").await;
    drain_join_frames(&mut alice).await;
    let mut bob = connect(addr, "bob").await;
    drain_join_frames(&mut bob).await;
    recv_envelope(&mut alice).await; // user list after bob's join
    recv_envelope(&mut alice).await; // bob's join notice

    // when: alice sends a chat message
    alice.send(chat_message("alice", "hi")).await.unwrap();

    // then: both participants receive it
    let expected = Envelope::Chat(ChatPayload {
        room_name: "main".to_string(),
        user_id: "alice".to_string(),
        message: "hi".to_string(),
    });
    assert_eq!(recv_envelope(&mut alice).await, expected);
    assert_eq!(recv_envelope(&mut bob).await, expected);
}

#[tokio::test]
async fn test_late_joiner_receives_prior_messages() {
    // given: alice sent a message before bob connected
    let addr = start_server().await;
    let mut alice = connect(addr, "alice").await;
    drain_join_frames(&mut alice).await;
    alice.send(chat_message("alice", "hello")).await.unwrap();
    recv_envelope(&mut alice).await; // her own message back

    // when: bob connects
    let mut bob = connect(addr, "bob").await;

    // then: his history replay carries alice's message
    let Envelope::ChatHistory { entries } = recv_envelope(&mut bob).await else {
        panic!("expected a chatHistory frame first");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id, "alice");
    assert_eq!(entries[0].message, "hello");
}

#[tokio::test]
async fn test_disconnect_updates_user_list() {
    // given: alice and bob connected, join traffic drained
    let addr = start_server().await;
    let mut alice = connect(addr, "alice").await;
    drain_join_frames(&mut alice).await;
    let mut bob = connect(addr, "bob").await;
    drain_join_frames(&mut bob).await;
    recv_envelope(&mut alice).await;
    recv_envelope(&mut alice).await;

    // when: alice disconnects
    alice.close(None).await.unwrap();

    // then: bob sees the shrunk user list
    assert_eq!(
        recv_envelope(&mut bob).await,
        Envelope::UserList {
            users: vec!["bob".to_string()]
        }
    );
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    // given: alice connected
    let addr = start_server().await;
    let mut alice = connect(addr, "alice").await;
    drain_join_frames(&mut alice).await;

    // when: she sends a broken frame, then a valid one
    alice
        .send(Message::Text("{not json at all".into()))
        .await
        .unwrap();
    alice.send(chat_message("alice", "still here")).await.unwrap();

    // then: the connection survived and only the valid frame arrives
    assert_eq!(
        recv_envelope(&mut alice).await,
        Envelope::Chat(ChatPayload {
            room_name: "main".to_string(),
            user_id: "alice".to_string(),
            message: "still here".to_string(),
        })
    );
}
