//! Server network layer accepting WebSocket connections and pumping frames
//! between sockets and the session registry

use crate::config::ServerConfig;
use crate::registry::{SessionId, SessionRegistry};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::protocol::decode;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Relay server owning the listening socket and the shared registry
pub struct Server {
    listener: TcpListener,
    registry: Arc<RwLock<SessionRegistry>>,
    queue_size: usize,
}

impl Server {
    /// Binds the listening socket. Use port 0 to let the OS pick one and
    /// read it back with [`Server::local_addr`].
    pub async fn bind(config: ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            registry: Arc::new(RwLock::new(SessionRegistry::new(&config))),
            queue_size: config.queue_size.max(1),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<RwLock<SessionRegistry>> {
        Arc::clone(&self.registry)
    }

    /// Accepts connections forever, one task per connection
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let registry = Arc::clone(&self.registry);
                    let queue_size = self.queue_size;

                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_connection(stream, peer, registry, queue_size).await
                        {
                            warn!("Connection from {} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    /// Runs one connection from handshake to cleanup
    ///
    /// Outbound frames flow registry -> bounded queue -> writer task -> socket,
    /// so the registry never waits on a slow peer. Whichever side finishes
    /// first (peer closes, socket error, or the registry removing the session
    /// after an eviction) ends the connection, and the session is
    /// unregistered exactly once. Aborting the writer and returning drops
    /// both socket halves, so an evicted peer is closed even if it stopped
    /// reading.
    async fn handle_connection(
        stream: TcpStream,
        peer: SocketAddr,
        registry: Arc<RwLock<SessionRegistry>>,
        queue_size: usize,
    ) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        let ws_stream = accept_async(stream).await?;
        let (mut sink, mut source) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<String>(queue_size);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let id = registry.write().await.register_connection(tx, shutdown_tx);
        debug!("[{}]: Accepted from {}", id, peer);

        let mut writer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = sink.send(Message::Text(frame)).await {
                    debug!("Write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        loop {
            tokio::select! {
                incoming = source.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        Self::handle_frame(&registry, &id, &text).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => Self::handle_frame(&registry, &id, &text).await,
                        Err(_) => warn!("[{}]: Dropped non-UTF-8 binary frame", id),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("[{}]: Read failed: {}", id, e);
                        break;
                    }
                },
                _ = &mut writer => break,
                _ = &mut shutdown_rx => {
                    info!("[{}]: Closing connection to {}", id, peer);
                    break;
                }
            }
        }

        registry.write().await.unregister(&id);
        writer.abort();
        Ok(())
    }

    async fn handle_frame(registry: &RwLock<SessionRegistry>, id: &SessionId, text: &str) {
        debug!("[{}]: -> {}", id, text);

        match decode(text) {
            Ok(envelope) => {
                registry.write().await.record_and_route(id, envelope);
            }
            Err(e) => warn!("[{}]: Ignoring malformed frame: {}", id, e),
        }
    }
}
