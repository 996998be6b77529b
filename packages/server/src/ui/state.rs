//! Server state shared across request handlers.

use std::sync::Arc;

use crate::{auth::AuthGate, hub::RoomHandle};

/// Shared application state
pub struct AppState {
    /// Handle into the room actor's mailboxes
    pub room: RoomHandle,
    /// Auth gate consulted before any upgrade
    pub auth: Arc<dyn AuthGate>,
    /// Capacity of each connection's bounded outbound queue
    pub outbound_queue_capacity: usize,
}
