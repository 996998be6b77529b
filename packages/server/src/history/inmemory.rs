//! In-memory history store implementation.
//!
//! Keeps each room's records in a `Vec` behind a tokio `Mutex`; vector
//! order is the arrival order. Good enough for a single-process
//! deployment and for tests; a DBMS-backed store would implement the
//! same trait with a `(roomName, userID, message, seq)` table.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use irori_shared::time::{Clock, SystemClock};

use super::{HistoryError, HistoryRecord, HistoryStore};

/// In-memory `HistoryStore` implementation.
pub struct InMemoryHistoryStore {
    rooms: Mutex<HashMap<String, Vec<HistoryRecord>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryHistoryStore {
    /// Create an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store with an injected clock (for tests).
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(
        &self,
        room_name: &str,
        user_id: &str,
        message: &str,
    ) -> Result<(), HistoryError> {
        let mut rooms = self.rooms.lock().await;
        let records = rooms.entry(room_name.to_string()).or_default();
        let record = HistoryRecord {
            room_name: room_name.to_string(),
            user_id: user_id.to_string(),
            message: message.to_string(),
            seq: records.len() as u64,
            recorded_at: self.clock.now_millis(),
        };
        records.push(record);
        Ok(())
    }

    async fn fetch_history(&self, room_name: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(room_name).cloned().unwrap_or_default())
    }
}
