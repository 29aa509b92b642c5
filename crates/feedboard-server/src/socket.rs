//! WebSocket connections.
//!
//! Each connection can subscribe to several projects. Every subscription gets
//! a forwarding task that copies the project's change broadcasts into the
//! connection's outgoing queue; a single writer task owns the socket sink.

use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket};
use feedboard_core::project::ProjectId;
use feedboard_core::protocol::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// Handle a WebSocket connection
pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = Uuid::new_v4();
    info!("New connection: {}", conn_id);

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to encode message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut forwards: HashMap<ProjectId, JoinHandle<()>> = HashMap::new();

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(&state, client_msg, &out_tx, &mut forwards),
                Err(e) => {
                    warn!("Invalid message from {}: {}", conn_id, e);
                    let _ = out_tx.send(ServerMessage::error(None, format!("Invalid message: {}", e)));
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // Ping/pong are answered by axum
            Err(e) => {
                warn!("WebSocket error for {}: {}", conn_id, e);
                break;
            }
        }
    }

    for (_, forward) in forwards {
        forward.abort();
    }
    writer.abort();
    info!("Connection closed: {}", conn_id);
}

fn handle_message(
    state: &AppState,
    msg: ClientMessage,
    out_tx: &Outbox,
    forwards: &mut HashMap<ProjectId, JoinHandle<()>>,
) {
    match msg {
        ClientMessage::Subscribe { project } => {
            let (mut rx, document) = state.subscribe(&project);
            if let Some(document) = document {
                let _ = out_tx.send(ServerMessage::Subscribed {
                    project: project.clone(),
                    document,
                });
            }

            let tx = out_tx.clone();
            let name = project.clone();
            let forward = tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(msg) => {
                            if tx.send(msg).is_err() {
                                break;
                            }
                        }
                        // Every change carries the whole document, so the next
                        // one brings the subscriber up to date.
                        Err(RecvError::Lagged(skipped)) => warn!("Subscriber of {} skipped {} changes", name, skipped),
                        Err(RecvError::Closed) => break,
                    }
                }
            });
            if let Some(previous) = forwards.insert(project.clone(), forward) {
                previous.abort();
            }
            debug!("Subscribed to {}", project);
        }
        ClientMessage::Unsubscribe { project } => {
            if let Some(forward) = forwards.remove(&project) {
                forward.abort();
                debug!("Unsubscribed from {}", project);
            }
        }
        ClientMessage::Write { project, patch, merge } => {
            if patch.is_empty() && merge {
                let _ = out_tx.send(ServerMessage::error(Some(project), "Empty write"));
                return;
            }
            state.write(&project, patch, merge);
        }
    }
}
