//! WebSocket server message handling - sends messages to clients

use axum::{
    body::Bytes,
    extract::ws::{Message, WebSocket},
};
use futures::SinkExt;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{Receiver, UnboundedReceiver},
    RwLock,
};
use tokio::time::interval;

use crate::models::api::ServerMessage;

use super::{SocketState, WsSettings};

/// Drain the connection outbox and the ack channel into the socket, and run the
/// ping/pong keepalive
pub(super) async fn handle_server_messages(
    mut sender: futures::stream::SplitSink<WebSocket, Message>,
    mut outbox: Receiver<ServerMessage>,
    mut ack_rx: UnboundedReceiver<ServerMessage>,
    socket_state: Arc<RwLock<SocketState>>,
    settings: WsSettings,
) {
    let mut ping_interval = interval(settings.ping_interval);

    loop {
        tokio::select! {
            // Send ping and check for timeouts
            _ = ping_interval.tick() => {
                let state = socket_state.read().await;

                // 1. Check if last pong was too long ago (dead connection)
                if state.last_pong.elapsed() > settings.pong_timeout {
                    log::warn!("No pong received for {:?}, disconnecting client", state.last_pong.elapsed());
                    break;
                }

                // 2. Check if client has joined nothing for too long
                if state.joined.is_empty() && state.last_membership_change.elapsed() > settings.idle_timeout {
                    log::info!("Client joined no session for {:?}, disconnecting", state.last_membership_change.elapsed());
                    break;
                }

                drop(state);

                // 3. Send ping
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    log::error!("Failed to send ping, client disconnected");
                    break;
                }
                log::debug!("Sent ping to client");
            }

            // Direct replies to this client (pong, errors)
            Some(ack) = ack_rx.recv() => {
                if send_json(&mut sender, &ack).await.is_err() {
                    log::error!("Failed to send acknowledgment to client");
                    break;
                }
                log::debug!("Sent acknowledgment: {:?}", ack);
            }

            // Broadcast traffic, in commit order
            message = outbox.recv() => {
                let Some(message) = message else {
                    log::debug!("Outbox closed");
                    break;
                };
                if send_json(&mut sender, &message).await.is_err() {
                    log::error!("Failed to send message to client");
                    break;
                }
            }
        }
    }
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            log::error!("Failed to serialize server message: {}", e);
            Ok(())
        }
    }
}
