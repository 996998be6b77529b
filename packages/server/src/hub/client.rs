//! Per-connection client handle and queue overflow policy.

use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of one live connection. Two connections for the same
/// user id get distinct conn ids.
pub type ConnId = Uuid;

/// The room actor's handle to one live connection.
///
/// `user_id` is immutable for the connection's lifetime. `outbound` is
/// the sending half of the connection's bounded queue; the actor holds
/// the only sender, so dropping the handle closes the queue and is the
/// sole teardown signal to the connection's writer loop.
pub struct ClientHandle {
    pub conn_id: ConnId,
    pub user_id: String,
    pub outbound: mpsc::Sender<String>,
}

impl ClientHandle {
    pub fn new(user_id: String, outbound: mpsc::Sender<String>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            user_id,
            outbound,
        }
    }
}

/// What the actor does when a client's outbound queue is full.
///
/// Blocking the actor on one slow client would stall fan-out to every
/// other client, so that is not an option here. A send to a queue
/// whose writer is gone always evicts, independent of this policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the frame that did not fit; the slow client misses it.
    #[default]
    DropNewest,
    /// Evict the slow client from the room.
    Disconnect,
}
