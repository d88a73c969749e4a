//! Per-frame client loop: apply what arrived, step the local player, decide
//! what to send

use crate::sync::{SyncAdapter, SyncConfig};
use log::warn;
use shared::{step, time_scale_for, Envelope, Keys, PhysicsConfig, Player, World};

/// Frames longer than this are simulated as if they took this long.
pub const MAX_FRAME_MS: f32 = 50.0;

pub struct ClientGame {
    world: World,
    physics: PhysicsConfig,
    sync: SyncAdapter,
}

impl ClientGame {
    pub fn new(world: World, physics: PhysicsConfig, sync: SyncConfig) -> Self {
        Self {
            world,
            physics,
            sync: SyncAdapter::new(sync),
        }
    }

    /// Runs one frame and returns the envelopes to send, in order
    ///
    /// Inbound frames are applied before the local step, so a render pass
    /// after this call never sees a half-applied update.
    pub fn frame(
        &mut self,
        inbound: impl IntoIterator<Item = String>,
        keys: Keys,
        running: bool,
        frame_ms: f32,
    ) -> Vec<Envelope> {
        let mut outbound: Vec<Envelope> = inbound
            .into_iter()
            .filter_map(|text| self.sync.handle_frame(&text))
            .collect();

        let time_scale = time_scale_for(frame_ms.clamp(0.0, MAX_FRAME_MS));
        let Some(local) = self.sync.local_mut() else {
            return outbound;
        };
        local.keys = keys;
        local.running = running;
        let events = step(local, &self.world, &self.physics, time_scale);

        match self.sync.after_tick(events) {
            Ok(Some(update)) => outbound.push(update),
            Ok(None) => {}
            Err(e) => warn!("Failed to build update: {}", e),
        }

        outbound
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn sync(&self) -> &SyncAdapter {
        &self.sync
    }

    pub fn local(&self) -> Option<&Player> {
        self.sync.local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use serde_json::json;
    use shared::protocol::{CREATE_PLAYER, UPDATE_PLAYER};
    use shared::{TileGrid, WorldConfig};

    fn game() -> ClientGame {
        let world = World::from_grid(TileGrid::with_floor(20, 11, 16.0, 3), WorldConfig::default());
        ClientGame::new(world, PhysicsConfig::default(), SyncConfig::default())
    }

    fn connected(id: &str) -> String {
        json!({"_t": "_connected", "_p": {"id": id, "playersData": {id: {}}}}).to_string()
    }

    #[test]
    fn test_idle_before_connected() {
        let mut game = game();
        assert!(game.frame(Vec::new(), Keys::default(), false, 10.0).is_empty());
        assert!(game.local().is_none());
    }

    #[test]
    fn test_connect_then_fall_and_land() {
        let mut game = game();
        let first = game.frame(vec![connected("1")], Keys::default(), false, 10.0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, CREATE_PLAYER);
        assert_approx_eq!(game.local().unwrap().y, 0.2);

        let mut landed_updates = 0;
        for _ in 0..200 {
            let out = game.frame(Vec::new(), Keys::default(), false, 10.0);
            landed_updates += out.iter().filter(|e| e.kind == UPDATE_PLAYER).count();
        }

        let local = game.local().unwrap();
        assert!(local.grounded);
        assert_approx_eq!(local.y + 16.0, 127.9, 1e-3);
        assert_eq!(landed_updates, 1);
    }

    #[test]
    fn test_key_change_sends_update() {
        let mut game = game();
        game.frame(vec![connected("1")], Keys::default(), false, 10.0);

        let right = Keys {
            right: true,
            ..Keys::default()
        };
        let out = game.frame(Vec::new(), right, false, 10.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload["keys"]["right"], json!(true));
        assert!(game.local().unwrap().x > 0.0);

        assert!(game.frame(Vec::new(), right, false, 10.0).is_empty());
    }

    #[test]
    fn test_remote_mirror_not_simulated() {
        let mut game = game();
        game.frame(
            vec![
                connected("2"),
                r#"{"_t":"create_player","_p":{"id":"1","x":40,"y":0}}"#.to_string(),
            ],
            Keys::default(),
            false,
            10.0,
        );

        for _ in 0..10 {
            game.frame(Vec::new(), Keys::default(), false, 10.0);
        }
        let remote = game.sync().remote("1").unwrap();
        assert_approx_eq!(remote.x, 40.0);
        assert_approx_eq!(remote.y, 0.0);
    }

    #[test]
    fn test_long_frames_are_capped() {
        let mut game = game();
        game.frame(vec![connected("1")], Keys::default(), false, 10_000.0);
        assert_approx_eq!(game.local().unwrap().y, 0.2 * (MAX_FRAME_MS / 10.0));
    }
}
