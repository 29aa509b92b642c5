//! WebSocket client for the document server.
//!
//! Uses a background thread for non-blocking operation. Documents pushed by
//! the server are cached so `read` answers from the last known state.

use super::{BoxFuture, RemoteEvent, RemoteStore, Subscribers, Subscription, SyncError, SyncResult, WriteOptions};
use crate::project::{DocumentPatch, ProjectDocument, ProjectId};
use crate::protocol::{ClientMessage, ServerMessage};
use std::collections::HashMap;
use std::net::TcpStream;
use std::sync::mpsc::{Sender, TryRecvError, channel};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, connect};
use url::Url;

/// Poll interval of the socket thread between queued commands.
const READ_TIMEOUT: Duration = Duration::from_millis(50);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);
/// How much of an outgoing message is logged.
const LOG_PREVIEW_BYTES: usize = 100;

/// Bound blocking reads so queued commands are sent on a quiet connection.
///
/// The timeout goes on the TCP stream under TLS too; without it a `wss`
/// socket would sit in `read` until the server speaks.
fn set_timeouts(stream: &mut MaybeTlsStream<TcpStream>) {
    let tcp = match stream {
        MaybeTlsStream::Plain(tcp) => tcp,
        MaybeTlsStream::Rustls(tls) => &mut tls.sock,
        #[allow(unreachable_patterns)]
        _ => {
            log::warn!("Unknown WebSocket stream type, reads may block");
            return;
        }
    };
    if let Err(e) = tcp.set_read_timeout(Some(READ_TIMEOUT)) {
        log::warn!("Failed to set WebSocket read timeout: {}", e);
    }
    let _ = tcp.set_write_timeout(Some(WRITE_TIMEOUT));
}

/// At most `max` bytes of `msg`, cut on a character boundary.
fn preview(msg: &str, max: usize) -> &str {
    if msg.len() <= max {
        return msg;
    }
    let mut end = max;
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    &msg[..end]
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// State shared with the socket thread.
#[derive(Default)]
struct Shared {
    cache: Mutex<HashMap<ProjectId, ProjectDocument>>,
    subscribers: Subscribers,
    state: Mutex<Option<ConnectionState>>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        if let Ok(mut slot) = self.state.lock() {
            *slot = Some(state);
        }
    }

    /// Apply one message from the server.
    fn handle(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::Subscribed { project, document } | ServerMessage::Changed { project, document } => {
                if let Ok(mut cache) = self.cache.lock() {
                    cache.insert(project.clone(), document.clone());
                }
                self.subscribers.broadcast(&project, &RemoteEvent::Changed(document));
            }
            ServerMessage::Error {
                project: Some(project),
                message,
            } => {
                log::warn!("Server error for {}: {}", project, message);
                self.subscribers.broadcast(&project, &RemoteEvent::ReadFailed(message));
            }
            ServerMessage::Error { project: None, message } => {
                log::error!("Server error: {}", message);
            }
        }
    }
}

/// Remote store speaking the JSON protocol to `feedboard-server`.
pub struct WsStore {
    shared: Arc<Shared>,
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Mutex<Option<Sender<WsCommand>>>,
    /// Handle to the WebSocket thread.
    _thread: Option<JoinHandle<()>>,
}

impl WsStore {
    /// Connect to a `ws://` or `wss://` URL.
    ///
    /// Returns once the socket thread is started; the handshake completes in
    /// the background.
    pub fn connect(url: &str) -> SyncResult<Self> {
        let parsed_url = Url::parse(url).map_err(|e| SyncError::Connection(format!("Invalid URL: {}", e)))?;
        if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
            return Err(SyncError::Connection(format!(
                "Invalid WebSocket URL scheme: {}",
                parsed_url.scheme()
            )));
        }

        let shared = Arc::new(Shared::default());
        shared.set_state(ConnectionState::Connecting);
        let (cmd_tx, cmd_rx) = channel::<WsCommand>();

        let url = url.to_string();
        let thread_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            let shared = thread_shared;
            log::info!("WebSocket thread: connecting to {}", url);

            let (mut socket, response) = match connect(&url) {
                Ok(pair) => pair,
                Err(e) => {
                    log::error!("WebSocket connection failed: {}", e);
                    shared.set_state(ConnectionState::Error);
                    return;
                }
            };
            log::info!("WebSocket connected, status: {}", response.status());
            shared.set_state(ConnectionState::Connected);

            set_timeouts(socket.get_mut());

            loop {
                match cmd_rx.try_recv() {
                    Ok(WsCommand::Send(msg)) => {
                        log::debug!("WebSocket sending: {}", preview(&msg, LOG_PREVIEW_BYTES));
                        if let Err(e) = socket.send(Message::Text(msg)) {
                            log::error!("WebSocket send error: {}", e);
                            break;
                        }
                    }
                    Ok(WsCommand::Close) => {
                        log::info!("WebSocket close requested");
                        let _ = socket.close(None);
                        break;
                    }
                    Err(TryRecvError::Disconnected) => {
                        log::info!("WebSocket command channel disconnected");
                        break;
                    }
                    Err(TryRecvError::Empty) => {}
                }

                match socket.read() {
                    Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                        Ok(msg) => shared.handle(msg),
                        Err(e) => log::warn!("Failed to parse server message: {}", e),
                    },
                    Ok(Message::Ping(data)) => {
                        let _ = socket.send(Message::Pong(data));
                    }
                    Ok(Message::Close(_)) => {
                        log::info!("WebSocket received close frame");
                        break;
                    }
                    Ok(_) => {}
                    Err(tungstenite::Error::Io(ref e))
                        if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut =>
                    {
                        continue;
                    }
                    Err(e) => {
                        log::error!("WebSocket read error: {}", e);
                        break;
                    }
                }
            }

            log::info!("WebSocket thread exiting");
            shared.set_state(ConnectionState::Disconnected);
        });

        Ok(Self {
            shared,
            cmd_tx: Mutex::new(Some(cmd_tx)),
            _thread: Some(handle),
        })
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared
            .state
            .lock()
            .ok()
            .and_then(|s| *s)
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Disconnect from the server.
    pub fn disconnect(&self) {
        if let Ok(mut slot) = self.cmd_tx.lock() {
            if let Some(tx) = slot.take() {
                let _ = tx.send(WsCommand::Close);
            }
        }
    }

    fn send(&self, msg: &ClientMessage) -> SyncResult<()> {
        let json = serde_json::to_string(msg).map_err(|e| SyncError::Serialization(e.to_string()))?;
        let slot = self
            .cmd_tx
            .lock()
            .map_err(|e| SyncError::Other(format!("Lock error: {}", e)))?;
        let tx = slot
            .as_ref()
            .ok_or_else(|| SyncError::Connection("Not connected".to_string()))?;
        tx.send(WsCommand::Send(json))
            .map_err(|e| SyncError::Connection(format!("Send failed: {}", e)))
    }
}

impl RemoteStore for WsStore {
    fn subscribe(&self, project: &str) -> SyncResult<Subscription> {
        let cached = self
            .shared
            .cache
            .lock()
            .ok()
            .and_then(|c| c.get(project).cloned());
        let subscription = self
            .shared
            .subscribers
            .register(project, cached.map(RemoteEvent::Changed))?;
        self.send(&ClientMessage::Subscribe {
            project: project.to_string(),
        })?;
        Ok(subscription)
    }

    fn read(&self, project: &str) -> BoxFuture<'_, SyncResult<ProjectDocument>> {
        let project = project.to_string();
        Box::pin(async move {
            let cache = self
                .shared
                .cache
                .lock()
                .map_err(|e| SyncError::Other(format!("Lock error: {}", e)))?;
            cache.get(&project).cloned().ok_or(SyncError::NotFound(project))
        })
    }

    /// Resolves once the message is queued; the server's change notification
    /// confirms it.
    fn write(&self, project: &str, patch: DocumentPatch, options: WriteOptions) -> BoxFuture<'_, SyncResult<()>> {
        let msg = ClientMessage::Write {
            project: project.to_string(),
            patch,
            merge: options.merge,
        };
        Box::pin(async move { self.send(&msg) })
    }
}

impl Drop for WsStore {
    fn drop(&mut self) {
        self.disconnect();
    }
}
