//! Bridge between the local simulation and the relay
//!
//! Inbound envelopes are decoded into typed events and applied to mirrored
//! remote players. After each local step the adapter decides whether the
//! local player's state changed enough to be worth an `update_player`.

use log::{debug, info, warn};
use shared::protocol::{
    decode, ConnectedPayload, CreatePlayerPayload, Data, Envelope, Event, PositionData, Speed,
    UpdatePlayerPayload, CREATE_PLAYER, UPDATE_PLAYER,
};
use shared::{Keys, Player, ProtocolError, StepEvents};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    /// Also send an update whenever the local position changes, not only on
    /// key changes, jumps and landings.
    pub track_position: bool,
    pub spawn_x: f32,
    pub spawn_y: f32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            track_position: false,
            spawn_x: 0.0,
            spawn_y: 0.0,
        }
    }
}

/// What the relay last heard from us.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SentState {
    keys: Keys,
    x: f32,
    y: f32,
}

impl SentState {
    fn of(player: &Player) -> Self {
        Self {
            keys: player.keys,
            x: player.x,
            y: player.y,
        }
    }
}

#[derive(Debug)]
pub struct SyncAdapter {
    config: SyncConfig,
    local: Option<Player>,
    remotes: HashMap<String, Player>,
    last_sent: Option<SentState>,
}

impl SyncAdapter {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            local: None,
            remotes: HashMap::new(),
            last_sent: None,
        }
    }

    /// Decodes and applies one text frame. Malformed or unknown frames are
    /// logged and dropped. Returns an envelope to send back, if any.
    pub fn handle_frame(&mut self, text: &str) -> Option<Envelope> {
        let result = decode(text).and_then(|envelope| self.handle_envelope(&envelope));
        match result {
            Ok(reply) => reply,
            Err(ProtocolError::UnknownType(kind)) => {
                warn!("Unknown event: {}", kind);
                None
            }
            Err(e) => {
                warn!("Dropping inbound frame: {}", e);
                None
            }
        }
    }

    pub fn handle_envelope(
        &mut self,
        envelope: &Envelope,
    ) -> Result<Option<Envelope>, ProtocolError> {
        match Event::from_envelope(envelope)? {
            Event::Connected(connected) => self.on_connected(connected),
            Event::Disconnected(gone) => {
                if self.remotes.remove(&gone.id).is_some() {
                    info!("Player {} left", gone.id);
                }
                Ok(None)
            }
            Event::CreatePlayer(created) => {
                self.on_create_player(created);
                Ok(None)
            }
            Event::UpdatePlayer(update) => {
                self.on_update_player(update);
                Ok(None)
            }
        }
    }

    /// Compares the local player against what was last sent and builds an
    /// `update_player` when keys changed, the player jumped or landed, or
    /// (with `track_position`) the player moved.
    pub fn after_tick(&mut self, events: StepEvents) -> Result<Option<Envelope>, ProtocolError> {
        let (Some(local), Some(last)) = (&self.local, self.last_sent) else {
            return Ok(None);
        };

        let current = SentState::of(local);
        let keys_changed = current.keys != last.keys;
        let moved = self.config.track_position && (current.x != last.x || current.y != last.y);

        if !(keys_changed || moved || events.jumped || events.landed) {
            return Ok(None);
        }

        let envelope = update_envelope(local)?;
        self.last_sent = Some(current);
        Ok(Some(envelope))
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local.as_ref().map(|player| player.id.as_str())
    }

    pub fn local(&self) -> Option<&Player> {
        self.local.as_ref()
    }

    pub fn local_mut(&mut self) -> Option<&mut Player> {
        self.local.as_mut()
    }

    pub fn remote(&self, id: &str) -> Option<&Player> {
        self.remotes.get(id)
    }

    pub fn remotes(&self) -> impl Iterator<Item = &Player> {
        self.remotes.values()
    }

    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    fn on_connected(
        &mut self,
        connected: ConnectedPayload,
    ) -> Result<Option<Envelope>, ProtocolError> {
        if self.local.is_some() {
            warn!("Ignoring repeated _connected for {}", connected.id);
            return Ok(None);
        }
        info!("Connected as {}", connected.id);

        for (id, data) in &connected.players_data {
            if *id == connected.id {
                continue;
            }
            match data.as_object().and_then(position_of) {
                Some(position) => self.spawn_remote(id, position),
                None => debug!("Player {} has no position yet", id),
            }
        }

        let local = Player::new(connected.id, self.config.spawn_x, self.config.spawn_y);
        let position = PositionData {
            x: local.x,
            y: local.y,
        };
        let envelope = Envelope::typed(
            CREATE_PLAYER,
            &CreatePlayerPayload {
                id: local.id.clone(),
                x: local.x,
                y: local.y,
            },
        )?
        .with_player_data(&position)?;

        self.last_sent = Some(SentState::of(&local));
        self.local = Some(local);
        Ok(Some(envelope))
    }

    fn on_create_player(&mut self, created: CreatePlayerPayload) {
        if self.local_id() == Some(created.id.as_str()) {
            return;
        }
        self.spawn_remote(
            &created.id,
            PositionData {
                x: created.x,
                y: created.y,
            },
        );
    }

    fn on_update_player(&mut self, update: UpdatePlayerPayload) {
        let Some(remote) = self.remotes.get_mut(&update.id) else {
            debug!("Update for unknown player {} ignored", update.id);
            return;
        };
        remote.x = update.x;
        remote.y = update.y;
        remote.keys = update.keys;
        if let Some(speed) = update.speed {
            remote.hspeed = speed.h;
            remote.vspeed = speed.v;
        }
    }

    fn spawn_remote(&mut self, id: &str, position: PositionData) {
        info!("Player {} joined at ({}, {})", id, position.x, position.y);
        self.remotes
            .insert(id.to_string(), Player::new(id, position.x, position.y));
    }
}

fn position_of(data: &Data) -> Option<PositionData> {
    Some(PositionData {
        x: data.get("x")?.as_f64()? as f32,
        y: data.get("y")?.as_f64()? as f32,
    })
}

fn update_envelope(player: &Player) -> Result<Envelope, ProtocolError> {
    let payload = UpdatePlayerPayload {
        id: player.id.clone(),
        x: player.x,
        y: player.y,
        keys: player.keys,
        speed: Some(Speed {
            h: player.hspeed,
            v: player.vspeed,
        }),
    };
    Envelope::typed(UPDATE_PLAYER, &payload)?.with_player_data(&PositionData {
        x: player.x,
        y: player.y,
    })
}
