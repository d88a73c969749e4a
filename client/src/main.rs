use clap::Parser;
use client::game::{ClientGame, MAX_FRAME_MS};
use client::input::InputManager;
use client::network::Connection;
use client::rendering::Renderer;
use client::sync::SyncConfig;
use log::{error, info, warn};
use macroquad::prelude::*;
use shared::{
    PhysicsConfig, TileGrid, World, WorldConfig, FLOOR_ROWS, TILE_SIZE, WORLD_COLUMNS, WORLD_ROWS,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay WebSocket URL
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8081")]
    server: String,

    /// World width in tiles
    #[arg(long, default_value_t = WORLD_COLUMNS)]
    columns: usize,

    /// World height in tiles
    #[arg(long, default_value_t = WORLD_ROWS)]
    rows: usize,

    /// Tile edge length in world units
    #[arg(long, default_value_t = TILE_SIZE)]
    tile_size: f32,

    /// Solid rows at the bottom of the world
    #[arg(long, default_value_t = FLOOR_ROWS)]
    floor_rows: usize,

    /// Keep the player inside the world bounds
    #[arg(long)]
    clamp: bool,

    /// Send an update on every position change, not only on key changes
    #[arg(long)]
    track_position: bool,

    /// Window width
    #[arg(short = 'w', long, default_value = "960")]
    width: i32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "540")]
    height: i32,
}

fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let conf = Conf {
        window_title: "tilenet".to_string(),
        window_width: args.width,
        window_height: args.height,
        ..Default::default()
    };

    macroquad::Window::from_config(conf, run(args));
}

async fn run(args: Args) {
    let grid = TileGrid::with_floor(args.columns, args.rows, args.tile_size, args.floor_rows);
    let world = World::from_grid(
        grid,
        WorldConfig {
            clamp_to_bounds: args.clamp,
        },
    );
    let sync = SyncConfig {
        track_position: args.track_position,
        ..SyncConfig::default()
    };

    info!("Connecting to: {}", args.server);
    info!("Controls: A/D to move, Space to jump, Shift to run");

    let mut connection = match Connection::spawn(args.server.clone()) {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to start network thread: {}", e);
            return;
        }
    };

    let renderer = Renderer::new(world.grid());
    let mut game = ClientGame::new(world, PhysicsConfig::default(), sync);
    let mut input = InputManager::new();

    loop {
        let inbound = connection.drain();
        let (keys, running) = input.update();
        let frame_ms = (get_frame_time() * 1000.0).min(MAX_FRAME_MS);

        for envelope in game.frame(inbound, keys, running, frame_ms) {
            if let Err(e) = connection.send(&envelope) {
                warn!("Failed to send {}: {}", envelope.kind, e);
            }
        }

        renderer.render(
            game.world().grid(),
            game.local(),
            game.sync().remotes(),
            connection.is_open(),
        );

        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        next_frame().await;
    }
}
