//! JSON message envelope shared by client and relay.
//!
//! Every frame on the wire is a text object `{"_t": type, "_p": payload,
//! "_d": playerData}`. The relay only looks at `_t` and `_d`; the typed
//! payload structs below are what clients agree on.

use crate::movement::Keys;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type Data = Map<String, Value>;

pub const CONNECTED: &str = "_connected";
pub const DISCONNECTED: &str = "_disconnected";
pub const CREATE_PLAYER: &str = "create_player";
pub const UPDATE_PLAYER: &str = "update_player";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("invalid `{kind}` payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value does not serialize to a JSON object")]
    NotAnObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "_t")]
    pub kind: String,
    #[serde(rename = "_p", default, deserialize_with = "null_as_empty")]
    pub payload: Data,
    #[serde(
        rename = "_d",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Map::is_empty"
    )]
    pub player_data: Data,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Data) -> Self {
        Self {
            kind: kind.into(),
            payload,
            player_data: Data::new(),
        }
    }

    /// Builds an envelope from any payload that serializes to an object.
    pub fn typed<T: Serialize>(
        kind: impl Into<String>,
        payload: &T,
    ) -> Result<Self, ProtocolError> {
        Ok(Self::new(kind, to_data(payload)?))
    }

    pub fn with_player_data<T: Serialize>(mut self, data: &T) -> Result<Self, ProtocolError> {
        self.player_data = to_data(data)?;
        Ok(self)
    }

    /// Reads the payload as `T`, reporting the message type on failure.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(Value::Object(self.payload.clone())).map_err(|source| {
            ProtocolError::InvalidPayload {
                kind: self.kind.clone(),
                source,
            }
        })
    }
}

// `null` reads as an empty map
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Data, D::Error> {
    Ok(Option::<Data>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn to_data<T: Serialize>(value: &T) -> Result<Data, ProtocolError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(ProtocolError::NotAnObject),
    }
}

pub fn encode(envelope: &Envelope) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(envelope)?)
}

pub fn decode(text: &str) -> Result<Envelope, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub id: String,
    #[serde(rename = "playersData", default)]
    pub players_data: Data,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisconnectedPayload {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePlayerPayload {
    pub id: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    pub h: f32,
    pub v: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePlayerPayload {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub keys: Keys,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<Speed>,
}

/// The part of a player's state the relay keeps for bootstrapping joiners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    pub x: f32,
    pub y: f32,
}

/// Inbound messages a client knows how to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected(ConnectedPayload),
    Disconnected(DisconnectedPayload),
    CreatePlayer(CreatePlayerPayload),
    UpdatePlayer(UpdatePlayerPayload),
}

impl Event {
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        match envelope.kind.as_str() {
            CONNECTED => Ok(Event::Connected(envelope.payload_as()?)),
            DISCONNECTED => Ok(Event::Disconnected(envelope.payload_as()?)),
            CREATE_PLAYER => Ok(Event::CreatePlayer(envelope.payload_as()?)),
            UPDATE_PLAYER => Ok(Event::UpdatePlayer(envelope.payload_as()?)),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Connected(_) => CONNECTED,
            Event::Disconnected(_) => DISCONNECTED,
            Event::CreatePlayer(_) => CREATE_PLAYER,
            Event::UpdatePlayer(_) => UPDATE_PLAYER,
        }
    }
}
