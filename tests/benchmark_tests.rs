//! Performance sanity checks for the per-tick hot paths

use serde_json::json;
use shared::protocol::{decode, encode, Data};
use shared::{
    deep_merge, step, tile_meeting, Keys, PhysicsConfig, Player, TileGrid, World, WorldConfig,
};
use std::time::Instant;

fn walled_world() -> World {
    let grid = TileGrid::parse(
        "
        #..................#
        #..................#
        #..................#
        #..................#
        #.......###........#
        #..................#
        #..................#
        #..................#
        ####################
        ####################
        ####################
        ",
        16.0,
    )
    .unwrap();
    World::from_grid(grid, WorldConfig::default())
}

/// Benchmarks the point-sampled overlap test
#[test]
fn benchmark_tile_meeting() {
    let world = walled_world();
    let physics = PhysicsConfig::default();

    let iterations = 100_000;
    let start = Instant::now();

    let mut hits = 0;
    for i in 0..iterations {
        let x = (i % 300) as f32;
        if tile_meeting(world.grid(), &physics, x, 100.0) {
            hits += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Tile meeting: {} iterations in {:?} ({:.2} ns/iter, {} hits)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64,
        hits
    );

    assert!(duration.as_millis() < 100);
}

/// Benchmarks full movement steps with walls, a ledge and a floor
#[test]
fn benchmark_movement_step() {
    let world = walled_world();
    let physics = PhysicsConfig::default();
    let mut player = Player::new("1", 32.0, 0.0);

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        player.keys = Keys {
            left: (i / 200) % 2 == 1,
            right: (i / 200) % 2 == 0,
            jump: i % 50 == 0,
        };
        step(&mut player, &world, &physics, 1.0);
    }

    let duration = start.elapsed();
    println!(
        "Movement step: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 100);
    assert!(player.x.is_finite() && player.y.is_finite());
}

/// Benchmarks merging a typical position update into a player record
#[test]
fn benchmark_deep_merge() {
    let mut record = Data::new();
    let patch = match json!({"x": 12.5, "y": 159.9, "pos": {"x": 1, "y": 2}}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        deep_merge(&mut record, &patch);
    }

    let duration = start.elapsed();
    println!(
        "Deep merge: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 500);
    assert_eq!(record.len(), 3);
}

/// Benchmarks decoding and re-encoding an update frame, as the relay does
#[test]
fn benchmark_envelope_codec() {
    let frame = r#"{"_t":"update_player","_p":{"id":"1","x":12.5,"y":159.9,"keys":{"left":false,"right":true,"jump":false}},"_d":{"x":12.5,"y":159.9}}"#;

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let envelope = decode(frame).unwrap();
        let _ = encode(&envelope).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Envelope codec: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 1000);
}
