//! Keyboard sampling for the local player

use macroquad::prelude::*;
use shared::Keys;

/// Samples the movement keys once per frame
///
/// A/D or the arrow keys move, Space jumps, and either Shift key runs.
#[derive(Debug, Default)]
pub struct InputManager {
    current: Keys,
    running: bool,
    changed: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the keyboard and returns the held keys and the running flag.
    pub fn update(&mut self) -> (Keys, bool) {
        let keys = Keys {
            left: is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            right: is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
            jump: is_key_down(KeyCode::Space),
        };
        let running = is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift);
        self.apply(keys, running)
    }

    fn apply(&mut self, keys: Keys, running: bool) -> (Keys, bool) {
        self.changed = keys != self.current || running != self.running;
        self.current = keys;
        self.running = running;
        (keys, running)
    }

    pub fn current(&self) -> Keys {
        self.current
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the last sample differed from the one before it.
    pub fn changed(&self) -> bool {
        self.changed
    }
}
