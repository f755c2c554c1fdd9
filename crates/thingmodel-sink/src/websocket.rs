//! WebSocket-backed sink.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt as _, StreamExt as _};
use thingmodel_schema::Thing;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::SinkError;
use crate::frame::OutgoingFrame;
use crate::handle::{SinkHandle, SinkStats, SinkStatsSnapshot};
use crate::Sink;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on a single connection attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A sink that forwards every notification as a text frame to a WebSocket
/// endpoint.
///
/// A single writer task owns the connection. It connects on start and, when
/// the connection is down, makes one reconnection attempt before each frame.
/// Frames that cannot be written are logged and dropped; there is no retry.
#[derive(Debug)]
pub struct WebSocketSink {
    handle: SinkHandle,
    writer: JoinHandle<()>,
}

impl WebSocketSink {
    /// Spawns the writer task on the current runtime.
    pub fn spawn(name: impl Into<String>, endpoint: impl Into<String>, capacity: usize) -> Self {
        let (handle, rx) = SinkHandle::channel(name, capacity);
        let writer = Writer {
            sender: handle.name().to_string(),
            endpoint: endpoint.into(),
            stats: Arc::clone(handle.stats()),
            connection: None,
        };
        let writer = tokio::spawn(writer.run(rx));
        Self { handle, writer }
    }

    /// A new producer handle for this sink.
    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> SinkStatsSnapshot {
        self.handle.stats().snapshot()
    }

    /// Drops this sink's own handle and waits for the writer to drain.
    ///
    /// The writer only finishes once every other handle is dropped too.
    pub async fn shutdown(self) -> SinkStatsSnapshot {
        let stats = Arc::clone(self.handle.stats());
        drop(self.handle);
        if let Err(e) = self.writer.await {
            tracing::error!("sink writer task failed: {}", e);
        }
        stats.snapshot()
    }
}

/// Both halves of one live connection. The read half is drained so that
/// pings are answered and a close from the endpoint is noticed before the
/// next frame is written.
struct Connection {
    writer: SplitSink<WsStream, Message>,
    reader: SplitStream<WsStream>,
}

struct Writer {
    sender: String,
    endpoint: String,
    stats: Arc<SinkStats>,
    connection: Option<Connection>,
}

impl Writer {
    async fn run(mut self, mut rx: mpsc::Receiver<Arc<Thing>>) {
        tracing::info!(sink = %self.sender, endpoint = %self.endpoint, "sink writer started");
        if let Err(e) = self.reconnect().await {
            tracing::warn!(sink = %self.sender, "initial sink connection failed: {}", e);
        }

        loop {
            tokio::select! {
                next = rx.recv() => {
                    let Some(thing) = next else { break };
                    match self.deliver(&thing).await {
                        Ok(()) => self.stats.record_delivered(),
                        Err(e) => {
                            self.stats.record_undelivered();
                            tracing::warn!(
                                sink = %self.sender,
                                thing_id = %thing.id(),
                                "dropping undeliverable notification: {}",
                                e
                            );
                        }
                    }
                }
                incoming = next_incoming(&mut self.connection) => self.on_incoming(incoming),
            }
        }

        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.writer.close().await {
                tracing::debug!(sink = %self.sender, "error closing sink connection: {}", e);
            }
        }
        let stats = self.stats.snapshot();
        tracing::info!(
            sink = %self.sender,
            delivered = stats.delivered,
            undelivered = stats.undelivered,
            dropped = stats.dropped,
            "sink writer stopped"
        );
    }

    fn on_incoming(&mut self, incoming: Option<Result<Message, WsError>>) {
        match incoming {
            Some(Ok(Message::Close(_))) | None => {
                tracing::info!(sink = %self.sender, "sink endpoint closed the connection");
                self.connection = None;
            }
            // Pings are answered by the protocol layer; data frames are ignored.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!(sink = %self.sender, "sink connection failed: {}", e);
                self.connection = None;
            }
        }
    }

    async fn reconnect(&mut self) -> Result<(), SinkError> {
        let socket = connect(&self.endpoint).await?;
        tracing::info!(sink = %self.sender, endpoint = %self.endpoint, "sink connected");
        let (writer, reader) = socket.split();
        self.connection = Some(Connection { writer, reader });
        Ok(())
    }

    async fn deliver(&mut self, thing: &Thing) -> Result<(), SinkError> {
        let frame = OutgoingFrame::thing_registered(&self.sender, thing).encode()?;

        if self.connection.is_none() {
            self.reconnect().await?;
        }
        let Some(connection) = self.connection.as_mut() else {
            return Err(SinkError::Closed(self.sender.clone()));
        };

        let sent = connection.writer.send(Message::Text(frame.into())).await;
        if let Err(e) = sent {
            self.connection = None;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Next frame from the endpoint, or never if there is no connection.
async fn next_incoming(connection: &mut Option<Connection>) -> Option<Result<Message, WsError>> {
    match connection {
        Some(connection) => connection.reader.next().await,
        None => std::future::pending().await,
    }
}

async fn connect(endpoint: &str) -> Result<WsStream, SinkError> {
    match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(endpoint)).await {
        Ok(Ok((socket, _response))) => Ok(socket),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(SinkError::ConnectTimeout(endpoint.to_string())),
    }
}
