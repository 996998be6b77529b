//! Single-room WebSocket broadcast hub.
//!
//! The hub is one room actor plus a pair of pump loops per connection.
//! The actor owns all shared room state (client registry, presence set)
//! and is the only place it is ever touched; everything else in this
//! crate is ordinary request/response plumbing around it.

pub mod auth;
pub mod history;
pub mod hub;
pub mod ui;
