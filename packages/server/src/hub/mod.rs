//! The concurrent core of the chat server.
//!
//! One room actor owns all shared room state; a pair of pump loops per
//! connection bridges raw socket frames to the actor's mailboxes. No
//! other part of the crate holds shared mutable state.

mod client;
pub mod pump;
mod room;

pub use client::{ClientHandle, ConnId, OverflowPolicy};
pub use room::{RoomActor, RoomClosed, RoomConfig, RoomHandle};
