//! Scripted client without a window, for smoke-testing a running relay.

use clap::Parser;
use client::game::ClientGame;
use client::network::Connection;
use client::sync::SyncConfig;
use log::{info, warn};
use shared::{
    Keys, PhysicsConfig, TileGrid, World, WorldConfig, FLOOR_ROWS, TILE_SIZE, WORLD_COLUMNS,
    WORLD_ROWS,
};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Headless client that walks a player for a fixed number of ticks"
)]
struct Args {
    /// Relay WebSocket URL
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8081")]
    server: String,

    /// Frames to simulate before exiting
    #[arg(short = 't', long, default_value = "300")]
    ticks: u32,

    /// Hold the right key the whole time
    #[arg(long)]
    right: bool,
}

const FRAME_MS: u64 = 16;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let world = World::from_grid(
        TileGrid::with_floor(WORLD_COLUMNS, WORLD_ROWS, TILE_SIZE, FLOOR_ROWS),
        WorldConfig {
            clamp_to_bounds: true,
        },
    );
    let mut game = ClientGame::new(world, PhysicsConfig::default(), SyncConfig::default());
    let mut connection = Connection::start(args.server.clone());
    let keys = Keys {
        right: args.right,
        ..Keys::default()
    };

    let mut interval = tokio::time::interval(Duration::from_millis(FRAME_MS));
    for _ in 0..args.ticks {
        interval.tick().await;

        let inbound = connection.drain();
        if !connection.is_open() {
            warn!("Relay closed the connection");
            break;
        }
        for envelope in game.frame(inbound, keys, false, FRAME_MS as f32) {
            connection.send(&envelope)?;
        }
    }

    match game.local() {
        Some(player) => {
            info!(
                "Player {} finished at ({:.1}, {:.1}), grounded: {}",
                player.id, player.x, player.y, player.grounded
            );
            println!(
                "{} {:.1} {:.1} remotes={}",
                player.id,
                player.x,
                player.y,
                game.sync().remote_count()
            );
        }
        None => println!("never connected"),
    }

    Ok(())
}
