//! Wire envelope types for the chat protocol.
//!
//! Every frame on the wire is a JSON object with a `type` discriminant.
//! The envelope is validated at the protocol boundary; a frame whose
//! `type` is unknown or whose fields do not match its variant fails
//! deserialization and is treated as malformed by the hub.

use serde::{Deserialize, Serialize};

/// Payload of a `chat` frame, also the shape of one replayed history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Room the message was sent to
    #[serde(rename = "roomName")]
    pub room_name: String,
    /// Identity of the sender
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Message body
    pub message: String,
}

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Envelope {
    /// A chat message from one participant, fanned out to everyone.
    Chat(ChatPayload),
    /// A server-generated notice ("bob joined" and the like).
    System { message: String },
    /// Snapshot of the identities currently online. Order carries no meaning.
    UserList { users: Vec<String> },
    /// Replay of prior chat messages, oldest first. Sent once, to a
    /// newly joined client only.
    ChatHistory { entries: Vec<ChatPayload> },
}
