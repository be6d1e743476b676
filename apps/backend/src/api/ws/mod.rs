//! WebSocket surface: viewers join sessions and receive snapshots, operators
//! may also push updates and clock actions over the same socket

mod client;
mod server;
mod state;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Duration;

use crate::engine::Scoreboard;
use client::handle_client_messages;
use server::handle_server_messages;
use state::SocketState;

/// Keepalive and idle limits for a socket
#[derive(Debug, Clone)]
pub struct WsSettings {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    /// How long a socket may stay open without having joined any session
    pub idle_timeout: Duration,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Create WebSocket routes
pub fn create_ws<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static + WsState,
{
    Router::new().route("/ws", get(ws_handler::<S>))
}

/// WebSocket upgrade handler
async fn ws_handler<S>(ws: WebSocketUpgrade, State(state): State<S>) -> Response
where
    S: Clone + Send + Sync + 'static + WsState,
{
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Trait that AppState must implement to provide WebSocket functionality
pub trait WsState {
    fn scoreboard(&self) -> &Scoreboard;
    fn ws_settings(&self) -> &WsSettings;
}

/// Handle a WebSocket connection with ping/pong keepalive
async fn handle_socket<S>(socket: WebSocket, state: S)
where
    S: Clone + Send + Sync + 'static + WsState,
{
    let (sender, receiver) = socket.split();
    let (connection, outbox) = state.scoreboard().open_connection();
    let connection_id = connection.id();
    let socket_state = Arc::new(RwLock::new(SocketState::new()));
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();

    log::info!("WebSocket connection {} opened", connection_id);

    // Task 1: Handle incoming messages from client
    let mut recv_task = {
        let state = state.clone();
        let socket_state = socket_state.clone();

        tokio::spawn(async move {
            handle_client_messages(receiver, state.scoreboard(), connection, socket_state, ack_tx)
                .await
        })
    };

    // Task 2: Send outgoing messages to client + ping/pong management
    let mut send_task = {
        let settings = state.ws_settings().clone();
        let socket_state = socket_state.clone();

        tokio::spawn(async move {
            handle_server_messages(sender, outbox, ack_rx, socket_state, settings).await
        })
    };

    // Wait for either task to complete (disconnection)
    tokio::select! {
        _ = &mut recv_task => {
            log::info!("WebSocket receive task ended");
            send_task.abort();
        },
        _ = &mut send_task => {
            log::info!("WebSocket send task ended");
            recv_task.abort();
        },
    }

    let left = state.scoreboard().disconnect(connection_id);
    log::info!(
        "WebSocket connection {} closed (left {} sessions)",
        connection_id,
        left.len()
    );
}
