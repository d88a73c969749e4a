//! # Game Client Library
//!
//! Client side of the tile-world relay. Each client simulates only its own
//! player; every other player is a mirror moved by messages from the relay.
//!
//! ## Module Organization
//!
//! ### Sync Module (`sync`)
//! Applies inbound relay events to mirrored players and decides when the
//! local player's state is worth broadcasting:
//! - `create_player` exactly once after `_connected`
//! - `update_player` on key changes, jumps and landings (and optionally on
//!   every position change)
//! - bootstrap of existing players from the `_connected` snapshot
//!
//! ### Game Module (`game`)
//! The per-frame loop body: drain inbound frames, step the local player
//! against the tile grid, collect outbound envelopes. Free of any window or
//! socket so it can be driven from tests and the headless client.
//!
//! ### Network Module (`network`)
//! WebSocket connection on a tokio runtime, bridged to the frame loop with
//! channels. Runs either on a background thread or as a task.
//!
//! ### Input and Rendering Modules (`input`, `rendering`)
//! Thin macroquad wrappers for keyboard sampling and rectangle drawing.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientGame;
//! use client::network::Connection;
//! use client::sync::SyncConfig;
//! use shared::{Keys, PhysicsConfig, World};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut connection = Connection::start("ws://127.0.0.1:8081".to_string());
//!     let mut game = ClientGame::new(
//!         World::new(20, 11, 16.0),
//!         PhysicsConfig::default(),
//!         SyncConfig::default(),
//!     );
//!
//!     let inbound = connection.drain();
//!     for envelope in game.frame(inbound, Keys::default(), false, 16.0) {
//!         let _ = connection.send(&envelope);
//!     }
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
pub mod sync;
