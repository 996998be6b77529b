//! Shared library for the irori chat hub.
//!
//! Holds the pieces both the server and any client-side tooling need:
//! the wire envelope types, logging setup, and time utilities.

pub mod envelope;
pub mod logger;
pub mod time;
