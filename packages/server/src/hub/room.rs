//! The room actor: the single serialized coordinator for the chat room.
//!
//! All registry and presence mutations happen inside [`RoomActor::run`],
//! which multiplexes three bounded mailboxes (`join`, `leave`,
//! `forward`) with `tokio::select!`. That single logical thread of
//! control is the system's only synchronization mechanism; no locks
//! guard the room state because nothing else can reach it.
//!
//! Ordering contract: events submitted to the same mailbox are
//! processed in submission order. There is no ordering guarantee
//! between events arriving on different mailboxes at nearly the same
//! time; callers must not rely on one.

use std::{collections::HashMap, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use irori_shared::envelope::{ChatPayload, Envelope};

use crate::history::HistoryStore;

use super::client::{ClientHandle, ConnId, OverflowPolicy};

/// Capacity of each of the actor's three mailboxes.
const MAILBOX_CAPACITY: usize = 64;

/// Room actor configuration, fixed at startup.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Name of the (single) room, also the history replay key
    pub room_name: String,
    /// What to do when a client's outbound queue is full
    pub overflow_policy: OverflowPolicy,
    /// Upper bound on the history fetch during a join
    pub history_timeout: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            room_name: "main".to_string(),
            overflow_policy: OverflowPolicy::default(),
            history_timeout: Duration::from_secs(5),
        }
    }
}

/// The actor's mailboxes are gone, i.e. the actor stopped. Terminal
/// for the submitting connection only.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("room actor is no longer running")]
pub struct RoomClosed;

/// Cloneable handle into the room actor's mailboxes.
///
/// This is all a connection pump ever sees of the room: submission,
/// never state access.
#[derive(Clone)]
pub struct RoomHandle {
    join_tx: mpsc::Sender<ClientHandle>,
    leave_tx: mpsc::Sender<ConnId>,
    forward_tx: mpsc::Sender<String>,
}

impl RoomHandle {
    /// Register a connection with the room.
    pub async fn join(&self, client: ClientHandle) -> Result<(), RoomClosed> {
        self.join_tx.send(client).await.map_err(|_| RoomClosed)
    }

    /// Unregister a connection. Safe to submit for a connection that
    /// was already removed.
    pub async fn leave(&self, conn_id: ConnId) -> Result<(), RoomClosed> {
        self.leave_tx.send(conn_id).await.map_err(|_| RoomClosed)
    }

    /// Submit one inbound frame for persistence and fan-out.
    pub async fn forward(&self, frame: String) -> Result<(), RoomClosed> {
        self.forward_tx.send(frame).await.map_err(|_| RoomClosed)
    }
}

/// The single shared broadcast domain and its coordinator.
pub struct RoomActor {
    config: RoomConfig,
    store: Arc<dyn HistoryStore>,
    /// Registered connections. A connection is in here iff its writer
    /// loop can still receive from its outbound queue.
    clients: HashMap<ConnId, ClientHandle>,
    /// Live-connection count per user id; an identity is online while
    /// its count is non-zero.
    presence: HashMap<String, usize>,
    join_rx: mpsc::Receiver<ClientHandle>,
    leave_rx: mpsc::Receiver<ConnId>,
    forward_rx: mpsc::Receiver<String>,
}

impl RoomActor {
    /// Create the actor and its handle. The caller spawns
    /// [`RoomActor::run`]; the actor stops once every handle clone is
    /// dropped.
    pub fn new(config: RoomConfig, store: Arc<dyn HistoryStore>) -> (Self, RoomHandle) {
        let (join_tx, join_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (leave_tx, leave_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (forward_tx, forward_rx) = mpsc::channel(MAILBOX_CAPACITY);

        let actor = Self {
            config,
            store,
            clients: HashMap::new(),
            presence: HashMap::new(),
            join_rx,
            leave_rx,
            forward_rx,
        };
        let handle = RoomHandle {
            join_tx,
            leave_tx,
            forward_tx,
        };
        (actor, handle)
    }

    /// The processing loop. Whichever mailbox has a ready event is
    /// processed next; see the module docs for the ordering contract.
    pub async fn run(mut self) {
        tracing::info!(room = %self.config.room_name, "room actor started");
        loop {
            tokio::select! {
                Some(client) = self.join_rx.recv() => self.handle_join(client).await,
                Some(conn_id) = self.leave_rx.recv() => self.handle_leave(conn_id),
                Some(frame) = self.forward_rx.recv() => self.handle_forward(frame).await,
                else => break,
            }
        }
        tracing::info!(room = %self.config.room_name, "room actor stopped");
    }

    async fn handle_join(&mut self, client: ClientHandle) {
        let conn_id = client.conn_id;
        let user_id = client.user_id.clone();

        *self.presence.entry(user_id.clone()).or_default() += 1;
        self.clients.insert(conn_id, client);
        tracing::info!(%conn_id, %user_id, room = %self.config.room_name, "client joined");

        // History replay goes to the newcomer only, before any
        // broadcast generated after its join.
        let entries = self.load_history().await;
        if let Some(frame) = encode(&Envelope::ChatHistory { entries }) {
            let evict = match self.clients.get(&conn_id) {
                Some(client) => !try_enqueue(client, frame, self.config.overflow_policy),
                None => false,
            };
            if evict {
                self.remove_client(conn_id);
            }
        }

        self.publish_user_list();
        self.broadcast(&Envelope::System {
            message: format!("{user_id} joined"),
        });
    }

    /// Idempotent: a second leave for the same connection is a no-op.
    fn handle_leave(&mut self, conn_id: ConnId) {
        if !self.remove_client(conn_id) {
            return;
        }
        self.publish_user_list();
    }

    async fn handle_forward(&mut self, frame: String) {
        // Only well-formed chat envelopes reach history and peers.
        let payload = match serde_json::from_str::<Envelope>(&frame) {
            Ok(Envelope::Chat(payload)) => payload,
            Ok(envelope) => {
                tracing::warn!(room = %self.config.room_name, ?envelope, "dropping non-chat frame");
                return;
            }
            Err(error) => {
                tracing::warn!(room = %self.config.room_name, %error, "dropping malformed frame");
                return;
            }
        };

        // Liveness over durability: a persistence failure is logged
        // and fan-out still proceeds, so peers see the message live
        // even if it was never stored.
        if let Err(error) = self
            .store
            .append(&payload.room_name, &payload.user_id, &payload.message)
            .await
        {
            tracing::warn!(
                user_id = %payload.user_id,
                %error,
                "failed to persist chat message"
            );
        }

        // Peers get the original frame bytes, not a re-rendering.
        let victims = self.fan_out(&frame);
        if !victims.is_empty() {
            for conn_id in victims {
                self.remove_client(conn_id);
            }
            self.publish_user_list();
        }
    }

    /// Fetch the room's history under the configured timeout. Any
    /// failure degrades the join to an empty replay.
    async fn load_history(&self) -> Vec<ChatPayload> {
        let fetch = self.store.fetch_history(&self.config.room_name);
        match tokio::time::timeout(self.config.history_timeout, fetch).await {
            Ok(Ok(records)) => records
                .into_iter()
                .map(|record| ChatPayload {
                    room_name: record.room_name,
                    user_id: record.user_id,
                    message: record.message,
                })
                .collect(),
            Ok(Err(error)) => {
                tracing::warn!(room = %self.config.room_name, %error, "history fetch failed, replaying empty history");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(room = %self.config.room_name, "history fetch timed out, replaying empty history");
                Vec::new()
            }
        }
    }

    /// Remove a connection from registry and presence. Returns false
    /// if it was not registered. Dropping the handle closes the
    /// outbound queue, which ends the connection's writer loop.
    fn remove_client(&mut self, conn_id: ConnId) -> bool {
        let Some(client) = self.clients.remove(&conn_id) else {
            return false;
        };
        if let Some(count) = self.presence.get_mut(&client.user_id) {
            *count -= 1;
            if *count == 0 {
                self.presence.remove(&client.user_id);
            }
        }
        tracing::info!(
            %conn_id,
            user_id = %client.user_id,
            room = %self.config.room_name,
            "client removed"
        );
        true
    }

    /// Broadcast the presence snapshot, evicting any client whose
    /// queue forces it out, until the snapshot matches the registry.
    /// Terminates because every extra round removes a client.
    fn publish_user_list(&mut self) {
        loop {
            let envelope = Envelope::UserList {
                users: self.user_list(),
            };
            let Some(frame) = encode(&envelope) else {
                return;
            };
            let victims = self.fan_out(&frame);
            if victims.is_empty() {
                return;
            }
            for conn_id in victims {
                self.remove_client(conn_id);
            }
        }
    }

    fn broadcast(&mut self, envelope: &Envelope) {
        let Some(frame) = encode(envelope) else {
            return;
        };
        let victims = self.fan_out(&frame);
        if !victims.is_empty() {
            for conn_id in victims {
                self.remove_client(conn_id);
            }
            self.publish_user_list();
        }
    }

    /// Enqueue a frame on every registered client's outbound queue.
    /// Returns the connections that must be evicted (closed queue, or
    /// full queue under [`OverflowPolicy::Disconnect`]).
    fn fan_out(&self, frame: &str) -> Vec<ConnId> {
        let mut victims = Vec::new();
        for client in self.clients.values() {
            if !try_enqueue(client, frame.to_string(), self.config.overflow_policy) {
                victims.push(client.conn_id);
            }
        }
        victims
    }

    /// Identities currently online, sorted for consistent output.
    fn user_list(&self) -> Vec<String> {
        let mut users: Vec<String> = self.presence.keys().cloned().collect();
        users.sort();
        users
    }
}

/// Try to enqueue one frame for one client. Returns false if the
/// client must be evicted.
fn try_enqueue(client: &ClientHandle, frame: String, policy: OverflowPolicy) -> bool {
    match client.outbound.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => match policy {
            OverflowPolicy::DropNewest => {
                tracing::warn!(
                    conn_id = %client.conn_id,
                    user_id = %client.user_id,
                    "outbound queue full, dropping frame"
                );
                true
            }
            OverflowPolicy::Disconnect => {
                tracing::warn!(
                    conn_id = %client.conn_id,
                    user_id = %client.user_id,
                    "outbound queue full, disconnecting slow client"
                );
                false
            }
        },
        // The writer loop is gone; the registry invariant says this
        // client can no longer stay.
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Encode an envelope we built ourselves. Failure here is a bug, not
/// an input problem, so it is logged and the frame skipped.
fn encode(envelope: &Envelope) -> Option<String> {
    match serde_json::to_string(envelope) {
        Ok(frame) => Some(frame),
        Err(error) => {
            tracing::error!(%error, "failed to encode envelope");
            None
        }
    }
}
