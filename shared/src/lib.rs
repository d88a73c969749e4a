//! Types and rules shared by the relay server and the game client: the JSON
//! message envelope, deep merging of player data, the static tile grid and
//! the per-tick movement/collision step.

pub mod merge;
pub mod movement;
pub mod protocol;
pub mod tiles;

pub use merge::deep_merge;
pub use movement::{step, tile_meeting, time_scale_for, Keys, PhysicsConfig, Player, StepEvents};
pub use protocol::{decode, encode, Data, Envelope, Event, ProtocolError};
pub use tiles::{OutOfBounds, TileGrid, TileGridError, World, WorldConfig};

pub const TILE_SIZE: f32 = 16.0;
pub const PLAYER_SIZE: f32 = 16.0;
pub const PLAYER_SPEED: f32 = 1.5;
pub const ACCELERATION: f32 = 0.3;
pub const GRAVITY: f32 = 0.2;
pub const JUMP_IMPULSE: f32 = -4.0;

/// Offset applied against the direction of travel after a tile snap, so the
/// body rests just outside the tile it hit.
pub const SNAP_EPSILON: f32 = 0.1;
pub const MAX_SNAP_STEPS: u32 = 16;

/// Frame length (ms) that one unit of `time_scale` stands for.
pub const REFERENCE_FRAME_MS: f32 = 10.0;

pub const WORLD_COLUMNS: usize = 20;
pub const WORLD_ROWS: usize = 11;
pub const FLOOR_ROWS: usize = 3;
