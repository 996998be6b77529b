//! Single-room WebSocket chat hub.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin irori-server
//! cargo run --bin irori-server -- --host 0.0.0.0 --port 8180
//! ```

use std::{sync::Arc, time::Duration};

use clap::{Parser, ValueEnum};

use irori_server::{
    auth::CookieAuthGate,
    history::InMemoryHistoryStore,
    hub::{OverflowPolicy, RoomActor, RoomConfig},
    ui::Server,
};
use irori_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Single-room WebSocket chat hub", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8180")]
    port: u16,

    /// Name of the chat room
    #[arg(long, default_value = "main")]
    room: String,

    /// Capacity of each connection's outbound message queue
    #[arg(long, default_value_t = 256)]
    send_buffer: usize,

    /// What to do when a client's outbound queue is full
    #[arg(long, value_enum, default_value_t = OverflowArg::DropNewest)]
    overflow_policy: OverflowArg,

    /// Upper bound, in seconds, on the history fetch during a join
    #[arg(long, default_value_t = 5)]
    history_timeout_secs: u64,

    /// Name of the cookie carrying the authenticated user id
    #[arg(long, default_value = "auth")]
    auth_cookie: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OverflowArg {
    DropNewest,
    Disconnect,
}

impl From<OverflowArg> for OverflowPolicy {
    fn from(arg: OverflowArg) -> Self {
        match arg {
            OverflowArg::DropNewest => OverflowPolicy::DropNewest,
            OverflowArg::Disconnect => OverflowPolicy::Disconnect,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. History store
    // 2. Room actor
    // 3. Auth gate
    // 4. Server

    // 1. Create the history store (in-memory)
    let store = Arc::new(InMemoryHistoryStore::new());

    // 2. Create and spawn the room actor
    let config = RoomConfig {
        room_name: args.room.clone(),
        overflow_policy: args.overflow_policy.into(),
        history_timeout: Duration::from_secs(args.history_timeout_secs),
    };
    let (actor, room) = RoomActor::new(config, store);
    tokio::spawn(actor.run());
    tracing::info!("room '{}' created", args.room);

    // 3. Create the auth gate
    let auth = Arc::new(CookieAuthGate::new(args.auth_cookie));

    // 4. Create and run the server
    let server = Server::new(room, auth, args.send_buffer);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
