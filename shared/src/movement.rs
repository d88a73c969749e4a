//! Per-tick movement and tile collision for a single locally-controlled body.
//!
//! Displacement is resolved one axis at a time. When the candidate move on
//! an axis would put any corner of the body inside a solid cell, the body
//! creeps towards the obstacle one unit at a time (bounded by
//! `max_snap_steps`) and then snaps to the nearest tile boundary, offset by
//! `snap_epsilon` against the direction of travel. Corners are point-sampled,
//! so a fast body can pass through thin tiles.

use crate::tiles::{TileGrid, World};
use crate::{
    ACCELERATION, GRAVITY, JUMP_IMPULSE, MAX_SNAP_STEPS, PLAYER_SIZE, PLAYER_SPEED,
    REFERENCE_FRAME_MS, SNAP_EPSILON,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl Keys {
    /// -1 for left, 1 for right, 0 for neither or both.
    pub fn horizontal(&self) -> f32 {
        (self.right as i8 - self.left as i8) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    pub base_speed: f32,
    /// Change in `hspeed` per tick while approaching the target speed.
    pub acceleration: f32,
    pub gravity: f32,
    /// Vertical speed set on jump; negative is up.
    pub jump_impulse: f32,
    pub snap_epsilon: f32,
    pub max_snap_steps: u32,
    pub width: f32,
    pub height: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            base_speed: PLAYER_SPEED,
            acceleration: ACCELERATION,
            gravity: GRAVITY,
            jump_impulse: JUMP_IMPULSE,
            snap_epsilon: SNAP_EPSILON,
            max_snap_steps: MAX_SNAP_STEPS,
            width: PLAYER_SIZE,
            height: PLAYER_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Player {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub hspeed: f32,
    pub vspeed: f32,
    pub keys: Keys,
    pub grounded: bool,
    pub running: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            ..Self::default()
        }
    }
}

/// Things that happened during a step that peers may want to hear about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepEvents {
    pub jumped: bool,
    pub landed: bool,
}

/// Converts a frame duration into the simulation's time scale.
pub fn time_scale_for(frame_ms: f32) -> f32 {
    frame_ms / REFERENCE_FRAME_MS
}

/// Moves `value` towards `target` by at most `amount`.
pub fn approach(value: f32, target: f32, amount: f32) -> f32 {
    if value < target {
        (value + amount).min(target)
    } else {
        (value - amount).max(target)
    }
}

// f32::signum reports 1.0 for +0.0
fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// True if any corner of a body at `(x, y)` lies in a solid cell.
pub fn tile_meeting(grid: &TileGrid, physics: &PhysicsConfig, x: f32, y: f32) -> bool {
    let left = x;
    let right = x + physics.width;
    let top = y;
    let bottom = y + physics.height;

    grid.is_solid_at(left, top)
        || grid.is_solid_at(right, top)
        || grid.is_solid_at(left, bottom)
        || grid.is_solid_at(right, bottom)
}

fn snap(position: f32, tile_size: f32, direction: f32, epsilon: f32) -> f32 {
    // halves round up
    (position / tile_size + 0.5).floor() * tile_size - direction * epsilon
}

/// Advances `player` by one tick.
pub fn step(
    player: &mut Player,
    world: &World,
    physics: &PhysicsConfig,
    time_scale: f32,
) -> StepEvents {
    let grid = world.grid();
    let tile_size = grid.tile_size();

    let run_factor = if player.running { 2.0 } else { 1.0 };
    let target = player.keys.horizontal() * physics.base_speed * run_factor;
    player.hspeed = approach(player.hspeed, target, physics.acceleration);
    player.vspeed += physics.gravity;

    let mut move_x = player.hspeed * time_scale;
    let mut move_y = player.vspeed * time_scale;

    if tile_meeting(grid, physics, player.x + move_x, player.y) {
        let direction = sign(move_x);
        for _ in 0..physics.max_snap_steps {
            if tile_meeting(grid, physics, player.x + direction, player.y) {
                break;
            }
            player.x += direction;
        }
        player.x = snap(player.x, tile_size, direction, physics.snap_epsilon);
        move_x = 0.0;
        player.hspeed = 0.0;
    }

    if tile_meeting(grid, physics, player.x, player.y + move_y) {
        let direction = sign(move_y);
        for _ in 0..physics.max_snap_steps {
            if tile_meeting(grid, physics, player.x, player.y + direction) {
                break;
            }
            player.y += direction;
        }
        player.y = snap(player.y, tile_size, direction, physics.snap_epsilon);
        move_y = 0.0;
        player.vspeed = 0.0;
    }

    let was_grounded = player.grounded;
    player.grounded = tile_meeting(grid, physics, player.x, player.y + 1.0);

    let mut events = StepEvents {
        landed: !was_grounded && player.grounded,
        ..StepEvents::default()
    };

    if player.grounded && player.keys.jump && player.vspeed >= 0.0 {
        player.vspeed = physics.jump_impulse;
        events.jumped = true;
    }

    player.x += move_x;
    player.y += move_y;

    if world.config().clamp_to_bounds {
        player.x = player.x.clamp(0.0, (grid.world_width() - physics.width).max(0.0));
        player.y = player.y.clamp(0.0, (grid.world_height() - physics.height).max(0.0));
    }

    events
}
