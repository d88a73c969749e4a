//! # Relay Server Library
//!
//! A thin relay for small multiplayer sessions. The server runs no game
//! simulation; it assigns session ids, remembers what each client has told
//! it about itself, and forwards JSON envelopes between clients according to
//! a static routing table.
//!
//! ## Responsibilities
//!
//! ### Session Lifecycle
//! Every accepted WebSocket connection becomes a session with a unique id.
//! The newcomer receives `_connected` with its id and the merged player data
//! of everyone online. When a connection ends, the remaining sessions
//! receive `_disconnected`.
//!
//! ### Relaying
//! Each inbound envelope first has its `_d` deep-merged into the sender's
//! record, then is forwarded either back to the sender or to every other
//! session. Types without a route are logged and dropped.
//!
//! ### Back-pressure
//! Sessions are written through bounded queues. A full queue either drops
//! the frame for that session or evicts the session, depending on
//! [`config::OverflowPolicy`].
//!
//! ## Module Organization
//!
//! - `config`: routing table, id scheme, queue sizing
//! - `registry`: session records, merging and routing
//! - `network`: TCP accept loop and per-connection reader/writer tasks
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod network;
pub mod registry;
