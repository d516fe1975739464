//! Relay WebSocket Client
//!
//! Reconnecting client used by editor sessions to reach the relay. The
//! write half lives behind a mutex so any task can send; the read half is
//! drained by a spawned task that forwards decoded server messages over a
//! channel. When an established connection drops, the same task re-dials
//! with the bounded retry policy, rejoins the current document and asks
//! peers for the canvas state; sends made while disconnected fail fast
//! and are dropped, a later snapshot recovers convergence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, ServerMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSender = SplitSink<WsStream, Message>;
type SharedSender = Arc<Mutex<Option<WsSender>>>;

/// How many incoming messages may queue before the reader applies
/// backpressure.
const INCOMING_BUFFER: usize = 256;

/// Connection settings for [`SyncClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay WebSocket URL
    pub url: String,
    /// Connection attempts before giving up
    pub max_attempts: u32,
    /// Delay between attempts
    pub retry_delay: Duration,
}

impl ClientConfig {
    /// Config with the default retry policy
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_attempts: 5,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Reconnecting relay client
pub struct SyncClient {
    sender: SharedSender,
    connected: Arc<RwLock<bool>>,
    document: Arc<RwLock<Option<String>>>,
    closing: Arc<AtomicBool>,
}

impl SyncClient {
    /// Connect to the relay, retrying per the config. Returns the client
    /// and the stream of decoded server messages.
    pub async fn connect(config: &ClientConfig) -> Result<(Self, mpsc::Receiver<ServerMessage>)> {
        let stream = Self::dial(config).await?;
        let (write, read) = stream.split();

        let client = Self {
            sender: Arc::new(Mutex::new(Some(write))),
            connected: Arc::new(RwLock::new(true)),
            document: Arc::new(RwLock::new(None)),
            closing: Arc::new(AtomicBool::new(false)),
        };
        let (incoming_tx, incoming_rx) = mpsc::channel(INCOMING_BUFFER);

        let config = config.clone();
        let sender = client.sender.clone();
        let connected = client.connected.clone();
        let document = client.document.clone();
        let closing = client.closing.clone();
        tokio::spawn(async move {
            Self::connection_task(read, config, sender, connected, document, closing, incoming_tx)
                .await;
        });

        Ok((client, incoming_rx))
    }

    /// Send a message to the relay
    pub async fn send(&self, message: &ClientMessage) -> Result<()> {
        Self::send_via(&self.sender, message).await
    }

    /// Join a document room and ask peers for the current canvas state.
    /// The document is rejoined automatically after a reconnect.
    pub async fn join_document(&self, document_id: &str) -> Result<()> {
        *self.document.write().await = Some(document_id.to_string());
        self.send(&ClientMessage::JoinDocument {
            document_id: document_id.to_string(),
        })
        .await?;
        self.send(&ClientMessage::RequestCanvasState {
            document_id: document_id.to_string(),
        })
        .await
    }

    /// Leave a document room
    pub async fn leave_document(&self, document_id: &str) -> Result<()> {
        *self.document.write().await = None;
        self.send(&ClientMessage::LeaveDocument {
            document_id: document_id.to_string(),
        })
        .await
    }

    /// Whether the connection is live
    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Close the connection; no reconnect follows.
    pub async fn close(&self) {
        self.closing.store(true, Ordering::Release);
        let mut guard = self.sender.lock().await;
        if let Some(mut sender) = guard.take() {
            let _ = sender.send(Message::Close(None)).await;
        }
        *self.connected.write().await = false;
    }

    /// Dial the relay with bounded retries.
    async fn dial(config: &ClientConfig) -> Result<WsStream> {
        let mut last_err = String::new();
        for attempt in 1..=config.max_attempts {
            match connect_async(&config.url).await {
                Ok((stream, _)) => {
                    info!(url = %config.url, attempt, "relay connected");
                    return Ok(stream);
                }
                Err(e) => {
                    last_err = e.to_string();
                    warn!(url = %config.url, attempt, error = %last_err, "relay connect failed");
                    if attempt < config.max_attempts {
                        tokio::time::sleep(config.retry_delay).await;
                    }
                }
            }
        }
        Err(Error::Connect(last_err))
    }

    async fn send_via(sender: &SharedSender, message: &ClientMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        let mut guard = sender.lock().await;
        match guard.as_mut() {
            Some(sender) => sender
                .send(Message::Text(json))
                .await
                .map_err(|e| Error::Send(e.to_string())),
            None => Err(Error::NotConnected),
        }
    }

    /// Drain one connection's messages, then reconnect until closed.
    #[allow(clippy::too_many_arguments)]
    async fn connection_task(
        mut read: SplitStream<WsStream>,
        config: ClientConfig,
        sender: SharedSender,
        connected: Arc<RwLock<bool>>,
        document: Arc<RwLock<Option<String>>>,
        closing: Arc<AtomicBool>,
        incoming_tx: mpsc::Sender<ServerMessage>,
    ) {
        loop {
            Self::read_loop(&mut read, &incoming_tx).await;
            *connected.write().await = false;
            sender.lock().await.take();

            if closing.load(Ordering::Acquire) || incoming_tx.is_closed() {
                break;
            }

            info!("relay connection lost, reconnecting");
            let Ok(stream) = Self::dial(&config).await else {
                warn!("relay reconnect gave up");
                break;
            };
            let (write, new_read) = stream.split();
            *sender.lock().await = Some(write);
            *connected.write().await = true;
            read = new_read;

            // Rejoin and catch up on the fresh connection.
            let rejoin = document.read().await.clone();
            if let Some(document_id) = rejoin {
                let messages = [
                    ClientMessage::JoinDocument {
                        document_id: document_id.clone(),
                    },
                    ClientMessage::RequestCanvasState { document_id },
                ];
                for message in &messages {
                    if let Err(e) = Self::send_via(&sender, message).await {
                        warn!(error = %e, "rejoin after reconnect failed");
                        break;
                    }
                }
            }
        }
        info!("relay reader stopped");
    }

    async fn read_loop(read: &mut SplitStream<WsStream>, incoming_tx: &mpsc::Sender<ServerMessage>) {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(server_msg) => {
                        if incoming_tx.send(server_msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "ignoring unrecognized relay message");
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "relay read error");
                    break;
                }
            }
        }
    }
}
