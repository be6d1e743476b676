//! WebSocket client message handling - processes messages from clients

use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use tokio::time::Instant;

use crate::engine::hub::Connection;
use crate::engine::Scoreboard;
use crate::errors::ScoreboardError;
use crate::models::api::{ClientMessage, ServerMessage};
use crate::models::domain::{Origin, SessionCode};

use super::SocketState;

/// Handle incoming messages from the client
pub(super) async fn handle_client_messages(
    mut receiver: futures::stream::SplitStream<WebSocket>,
    scoreboard: &Scoreboard,
    connection: Connection,
    socket_state: Arc<RwLock<SocketState>>,
    ack_tx: UnboundedSender<ServerMessage>,
) {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_message(client_msg, scoreboard, &connection, &socket_state, &ack_tx)
                        .await;
                }
                Err(e) => send_error(&ack_tx, &ScoreboardError::from(e)),
            },
            Ok(Message::Pong(_)) => {
                socket_state.write().await.last_pong = Instant::now();
                log::debug!("Received pong from client");
            }
            Ok(Message::Close(frame)) => {
                log::info!("Client sent close frame: {:?}", frame);
                break;
            }
            Err(e) => {
                log::error!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }
}

async fn handle_message(
    client_msg: ClientMessage,
    scoreboard: &Scoreboard,
    connection: &Connection,
    socket_state: &RwLock<SocketState>,
    ack_tx: &UnboundedSender<ServerMessage>,
) {
    let result = match client_msg {
        ClientMessage::Join { code } => {
            // The joined ack goes through the outbox so it precedes later snapshots
            match scoreboard.join_broadcast(&code, connection.clone()).await {
                Ok(session) => {
                    let mut state = socket_state.write().await;
                    state.joined.insert(session.code);
                    state.last_membership_change = Instant::now();
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }

        ClientMessage::Leave { code } => match scoreboard.leave_broadcast(&code, connection.id()) {
            Ok(was_member) => {
                if let Ok(code) = SessionCode::parse(&code) {
                    let mut state = socket_state.write().await;
                    state.joined.remove(&code);
                    state.last_membership_change = Instant::now();
                    drop(state);

                    if !was_member {
                        log::debug!("Connection {} was not joined to {}", connection.id(), code);
                    }
                    connection.deliver(ServerMessage::Left { code });
                }
                Ok(())
            }
            Err(e) => Err(e),
        },

        ClientMessage::Update {
            code,
            fields,
            operator,
        } => {
            let origin = operator.map(Origin::new).unwrap_or_else(Origin::anonymous);
            scoreboard
                .submit_update(&code, &fields, &origin)
                .await
                .map(|_| ())
        }

        ClientMessage::Clock { code, action } => {
            scoreboard.clock_action(&code, action).await.map(|_| ())
        }

        ClientMessage::Signal { code, signal } => {
            scoreboard.signal(&code, signal).await.map(|_| ())
        }

        ClientMessage::Ping => {
            let _ = ack_tx.send(ServerMessage::Pong);
            Ok(())
        }
    };

    if let Err(e) = result {
        send_error(ack_tx, &e);
    }
}

fn send_error(ack_tx: &UnboundedSender<ServerMessage>, error: &ScoreboardError) {
    log::debug!("Rejected client request: {}", error);
    let _ = ack_tx.send(ServerMessage::Error {
        kind: error.error_code().to_string(),
        message: error.public_message(),
    });
}
