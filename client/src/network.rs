//! WebSocket connection to the relay, driven on a tokio runtime and bridged
//! to the frame loop with unbounded channels

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{encode, Envelope, ProtocolError};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Frame(String),
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("connection to the relay is closed")]
    Closed,
}

/// Handle held by the frame loop. Sending never blocks; inbound frames are
/// collected with [`Connection::drain`] once per frame.
pub struct Connection {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<NetworkEvent>,
    open: bool,
}

impl Connection {
    /// Runs the connection on its own thread with a private runtime, for
    /// callers that are not inside tokio (the macroquad window loop).
    pub fn spawn(url: String) -> std::io::Result<Self> {
        let (connection, outbound_rx, inbound_tx) = Self::channels();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        std::thread::Builder::new()
            .name("network".to_string())
            .spawn(move || runtime.block_on(drive(url, outbound_rx, inbound_tx)))?;

        Ok(connection)
    }

    /// Runs the connection as a task on the current tokio runtime.
    pub fn start(url: String) -> Self {
        let (connection, outbound_rx, inbound_tx) = Self::channels();
        tokio::spawn(drive(url, outbound_rx, inbound_tx));
        connection
    }

    fn channels() -> (
        Self,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedSender<NetworkEvent>,
    ) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        (
            Self {
                outbound,
                inbound,
                open: true,
            },
            outbound_rx,
            inbound_tx,
        )
    }

    pub fn send(&self, envelope: &Envelope) -> Result<(), ConnectionError> {
        let frame = encode(envelope)?;
        self.outbound
            .send(frame)
            .map_err(|_| ConnectionError::Closed)
    }

    /// Takes every frame received since the last call.
    pub fn drain(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(event) = self.inbound.try_recv() {
            match event {
                NetworkEvent::Frame(text) => frames.push(text),
                NetworkEvent::Closed => {
                    if self.open {
                        warn!("Disconnected from server");
                    }
                    self.open = false;
                }
            }
        }
        frames
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

async fn drive(
    url: String,
    outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<NetworkEvent>,
) {
    if let Err(e) = run_connection(&url, outbound, inbound.clone()).await {
        error!("Connection to {} failed: {}", url, e);
    }
    let _ = inbound.send(NetworkEvent::Closed);
}

/// Pumps frames both ways until either side closes.
pub async fn run_connection(
    url: &str,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<NetworkEvent>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (ws_stream, _) = connect_async(url).await?;
    info!("Connected to {}", url);
    let (mut sink, mut source) = ws_stream.split();

    loop {
        tokio::select! {
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    debug!("Received: {}", text);
                    if inbound.send(NetworkEvent::Frame(text)).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            frame = outbound.recv() => match frame {
                Some(frame) => sink.send(Message::Text(frame)).await?,
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
        }
    }

    info!("Connection to {} closed", url);
    Ok(())
}
