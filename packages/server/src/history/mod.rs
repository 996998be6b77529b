//! History store contract.
//!
//! The room actor depends on this trait, not on a concrete store, so
//! the persistence backend can be swapped without touching the hub
//! (dependency inversion, same seam the wider system uses for its
//! database-backed store).

mod inmemory;

pub use inmemory::InMemoryHistoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// One persisted chat message.
///
/// `seq` is the record's arrival order within its room and is assigned
/// by the store; replay returns records in ascending `seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub room_name: String,
    pub user_id: String,
    pub message: String,
    pub seq: u64,
    /// Unix timestamp in milliseconds (UTC) at append time
    pub recorded_at: i64,
}

/// Errors surfaced by a history store.
///
/// The actor treats every one of these as non-fatal: an append failure
/// is logged and fan-out proceeds, a fetch failure degrades the join
/// to an empty history replay.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only chat history, queryable by room.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist one chat message.
    async fn append(
        &self,
        room_name: &str,
        user_id: &str,
        message: &str,
    ) -> Result<(), HistoryError>;

    /// Fetch a room's records, oldest first. A room with no history
    /// yields an empty sequence, not an error.
    async fn fetch_history(&self, room_name: &str) -> Result<Vec<HistoryRecord>, HistoryError>;
}
