use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod models;

use api::ws::{WsSettings, WsState};
use engine::Scoreboard;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub scoreboard: Arc<Scoreboard>,
    pub ws: WsSettings,
}

impl AppState {
    pub fn new(scoreboard: Arc<Scoreboard>, ws: WsSettings) -> Self {
        Self { scoreboard, ws }
    }
}

impl WsState for AppState {
    fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    fn ws_settings(&self) -> &WsSettings {
        &self.ws
    }
}
