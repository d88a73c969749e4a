//! Session tracking and message routing for the relay
//!
//! This module owns everything the relay knows about connected clients:
//! - Session lifecycle (register on accept, unregister on close or eviction)
//! - Per-session merged player data used to bootstrap new joiners
//! - Routing of inbound envelopes according to the static routing table
//! - Non-blocking delivery into each session's bounded outbound queue
//!
//! The registry never touches sockets. Each session is reached through an
//! `mpsc::Sender<String>` of encoded frames, drained by that connection's
//! writer task, so a slow client can only ever fill its own queue.

use crate::config::{IdScheme, OverflowPolicy, RelayPolicy, RoutingTable, ServerConfig};
use log::{debug, info, warn};
use serde_json::Value;
use shared::deep_merge;
use shared::protocol::{
    encode, to_data, ConnectedPayload, Data, DisconnectedPayload, Envelope, ProtocolError,
    CONNECTED, DISCONNECTED,
};
use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

pub type SessionId = String;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("no live session with id {0}")]
    UnknownSession(SessionId),
    #[error("outbound queue full for session {0}")]
    QueueFull(SessionId),
    #[error("outbound queue closed for session {0}")]
    QueueClosed(SessionId),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Result of routing one inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Routed; the count is how many sessions accepted the frame.
    Delivered(usize),
    /// No route for the message type; the frame was dropped.
    UnknownType,
    /// The sending session is no longer registered.
    UnknownSession,
}

/// One live connection as seen by the relay
#[derive(Debug)]
pub struct Session {
    /// Identifier assigned by the registry, unique among live sessions
    pub id: SessionId,
    /// Everything this session has reported via `_d`, deep-merged
    pub player_data: Data,
    /// Encoded frames waiting for the connection's writer task
    outbound: mpsc::Sender<String>,
    /// Tells the connection task to close the socket once the session is gone
    shutdown: Option<oneshot::Sender<()>>,
}

impl Session {
    fn new(
        id: SessionId,
        outbound: mpsc::Sender<String>,
        shutdown: Option<oneshot::Sender<()>>,
    ) -> Self {
        Self {
            id,
            player_data: Data::new(),
            outbound,
            shutdown,
        }
    }
}

#[derive(Debug)]
enum IdAllocator {
    Counter { next: u64 },
    Random,
}

impl IdAllocator {
    fn new(scheme: IdScheme) -> Self {
        match scheme {
            IdScheme::Counter => IdAllocator::Counter { next: 1 },
            IdScheme::Random => IdAllocator::Random,
        }
    }

    fn allocate(&mut self, live: &HashMap<SessionId, Session>) -> SessionId {
        match self {
            IdAllocator::Counter { next } => {
                let id = next.to_string();
                *next += 1;
                id
            }
            IdAllocator::Random => loop {
                let id = format!("{:032x}", rand::random::<u128>());
                if !live.contains_key(&id) {
                    return id;
                }
            },
        }
    }
}

/// Registry of every live session and the routing rules between them
///
/// All mutation goes through `&mut self`; the network layer shares it behind
/// an async `RwLock`, which serializes registration, merging and removal.
/// Broadcasts collect their targets before sending, so sessions evicted
/// mid-broadcast are handled once the fan-out completes.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    ids: IdAllocator,
    routes: RoutingTable,
    overflow: OverflowPolicy,
    /// Sessions whose queues overflowed under `OverflowPolicy::Disconnect`
    evictions: Vec<SessionId>,
}

impl SessionRegistry {
    /// Creates an empty registry using the id scheme, routes and overflow
    /// policy from `config`.
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            ids: IdAllocator::new(config.id_scheme),
            routes: config.routes.clone(),
            overflow: config.overflow,
            evictions: Vec::new(),
        }
    }

    /// Registers a new connection and returns its id
    ///
    /// The new session immediately receives a `_connected` event with its id
    /// and the merged player data of every live session, itself included.
    pub fn register(&mut self, outbound: mpsc::Sender<String>) -> SessionId {
        self.insert_session(outbound, None)
    }

    /// Like [`SessionRegistry::register`], but `shutdown` fires when the
    /// session is removed for any reason, including overflow eviction. The
    /// connection task listens on it so an evicted peer's socket is closed
    /// even while its writer is stuck on a full socket.
    pub fn register_connection(
        &mut self,
        outbound: mpsc::Sender<String>,
        shutdown: oneshot::Sender<()>,
    ) -> SessionId {
        self.insert_session(outbound, Some(shutdown))
    }

    fn insert_session(
        &mut self,
        outbound: mpsc::Sender<String>,
        shutdown: Option<oneshot::Sender<()>>,
    ) -> SessionId {
        let id = self.ids.allocate(&self.sessions);
        self.sessions
            .insert(id.clone(), Session::new(id.clone(), outbound, shutdown));
        info!("[{}]: Connected ({} players)", id, self.sessions.len());

        let bootstrap = ConnectedPayload {
            id: id.clone(),
            players_data: self.snapshot(),
        };
        match to_data(&bootstrap) {
            Ok(payload) => {
                // failures are logged inside send_to
                let _ = self.send_to(&id, CONNECTED, payload);
            }
            Err(e) => warn!("[{}]: Failed to build bootstrap: {}", id, e),
        }

        id
    }

    /// Merges the envelope's player data into the sender's record, then
    /// relays the envelope according to the routing table
    ///
    /// Unknown message types are logged and dropped after the merge. The
    /// relayed frame carries type and payload only; player data stays on
    /// the server.
    pub fn record_and_route(&mut self, id: &str, envelope: Envelope) -> RouteOutcome {
        let Some(session) = self.sessions.get_mut(id) else {
            warn!("[{}]: Message from unknown session dropped", id);
            return RouteOutcome::UnknownSession;
        };
        deep_merge(&mut session.player_data, &envelope.player_data);

        let Some(policy) = self.routes.policy_for(&envelope.kind) else {
            warn!("[{}]: Unknown message type: {}", id, envelope.kind);
            return RouteOutcome::UnknownType;
        };

        let relayed = Envelope::new(envelope.kind, envelope.payload);
        let frame = match encode(&relayed) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("[{}]: Failed to encode {}: {}", id, relayed.kind, e);
                return RouteOutcome::Delivered(0);
            }
        };

        let delivered = match policy {
            RelayPolicy::ToSender => match self.deliver(id, &frame) {
                Ok(()) => 1,
                Err(e) => {
                    warn!("{}", e);
                    0
                }
            },
            RelayPolicy::ToOthers => self.fan_out(id, &frame),
        };
        self.process_evictions();

        RouteOutcome::Delivered(delivered)
    }

    /// Removes a session and tells everyone left that it is gone
    ///
    /// The session is removed before the `_disconnected` fan-out, so the
    /// departing id never receives its own event. Returns false (and sends
    /// nothing) if the id was already gone, which makes repeated close
    /// notifications harmless.
    pub fn unregister(&mut self, id: &str) -> bool {
        let removed = self.remove_and_announce(id);
        self.process_evictions();
        removed
    }

    /// Sends a single event to one session.
    pub fn send_to(&mut self, id: &str, kind: &str, payload: Data) -> Result<(), RelayError> {
        let frame = encode(&Envelope::new(kind, payload))?;
        let result = self.deliver(id, &frame);
        if let Err(e) = &result {
            warn!("Failed to send {} to {}: {}", kind, id, e);
        }
        self.process_evictions();
        result
    }

    /// Sends an event to every live session except `id`. Returns how many
    /// sessions accepted it.
    pub fn broadcast_except(&mut self, id: &str, kind: &str, payload: Data) -> usize {
        let frame = match encode(&Envelope::new(kind, payload)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode {}: {}", kind, e);
                return 0;
            }
        };
        let delivered = self.fan_out(id, &frame);
        self.process_evictions();
        delivered
    }

    /// Merged player data of every live session, keyed by session id.
    pub fn snapshot(&self) -> Data {
        self.sessions
            .iter()
            .map(|(id, session)| (id.clone(), Value::Object(session.player_data.clone())))
            .collect()
    }

    pub fn player_data(&self, id: &str) -> Option<&Data> {
        self.sessions.get(id).map(|session| &session.player_data)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn remove_and_announce(&mut self, id: &str) -> bool {
        let Some(session) = self.sessions.remove(id) else {
            return false;
        };
        if let Some(shutdown) = session.shutdown {
            let _ = shutdown.send(());
        }
        info!("[{}]: Disconnected ({} players)", id, self.sessions.len());

        let notice = DisconnectedPayload { id: id.to_string() };
        let frame =
            to_data(&notice).and_then(|payload| encode(&Envelope::new(DISCONNECTED, payload)));
        match frame {
            Ok(frame) => {
                self.fan_out(id, &frame);
            }
            Err(e) => warn!("[{}]: Failed to encode disconnect: {}", id, e),
        }
        true
    }

    fn fan_out(&mut self, except: &str, frame: &str) -> usize {
        let targets: Vec<SessionId> = self
            .sessions
            .keys()
            .filter(|id| id.as_str() != except)
            .cloned()
            .collect();

        let mut delivered = 0;
        for target in targets {
            match self.deliver(&target, frame) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("{}", e),
            }
        }
        delivered
    }

    fn deliver(&mut self, id: &str, frame: &str) -> Result<(), RelayError> {
        let session = self
            .sessions
            .get(id)
            .ok_or_else(|| RelayError::UnknownSession(id.to_string()))?;

        match session.outbound.try_send(frame.to_string()) {
            Ok(()) => {
                debug!("[{}]: <- {}", id, frame);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                if self.overflow == OverflowPolicy::Disconnect
                    && !self.evictions.iter().any(|e| e == id)
                {
                    self.evictions.push(id.to_string());
                }
                Err(RelayError::QueueFull(id.to_string()))
            }
            Err(TrySendError::Closed(_)) => Err(RelayError::QueueClosed(id.to_string())),
        }
    }

    fn process_evictions(&mut self) {
        while let Some(id) = self.evictions.pop() {
            warn!("[{}]: Outbound queue overflowed, evicting", id);
            self.remove_and_announce(&id);
        }
    }
}
