use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::api::ws::WsSettings;
use crate::engine::EngineSettings;
use crate::models::domain::{ClockPreset, GameClock};

/// Backend configuration (from apps/backend/config.toml plus SCOREBOARD__* env vars)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub clock: ClockConfig,
    pub broadcast: BroadcastConfig,
    pub websocket: WebSocketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; sessions live in memory only when unset
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Starting game clock for new sessions, "mm:ss"
    pub game_clock: GameClock,
    /// Starting shot clock for new sessions, in seconds
    pub shot_clock: u32,
    pub tick_millis: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        let preset = ClockPreset::default();
        Self {
            game_clock: preset.game_clock,
            shot_clock: preset.shot_clock,
            tick_millis: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Messages buffered per connection before new ones are dropped
    pub outbox_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    pub ping_interval_secs: u64,
    pub pong_timeout_secs: u64,
    /// Disconnect a socket that has joined nothing for this long
    pub idle_timeout_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 30,
            pong_timeout_secs: 60,
            idle_timeout_secs: 300,
        }
    }
}

impl Config {
    /// Load configuration from config.toml (optional) and the environment.
    /// `SCOREBOARD_CONFIG` overrides the file path; `SCOREBOARD__SECTION__KEY`
    /// overrides individual keys.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("SCOREBOARD_CONFIG")
            .unwrap_or_else(|_| format!("{}/config.toml", env!("CARGO_MANIFEST_DIR")));

        let builder = config::Config::builder()
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SCOREBOARD")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings = builder.build()?;
        settings.try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            preset: ClockPreset {
                game_clock: self.clock.game_clock,
                shot_clock: self.clock.shot_clock,
            },
            tick_period: Duration::from_millis(self.clock.tick_millis.max(1)),
            outbox_capacity: self.broadcast.outbox_capacity,
        }
    }

    pub fn ws_settings(&self) -> WsSettings {
        WsSettings {
            ping_interval: Duration::from_secs(self.websocket.ping_interval_secs.max(1)),
            pong_timeout: Duration::from_secs(self.websocket.pong_timeout_secs),
            idle_timeout: Duration::from_secs(self.websocket.idle_timeout_secs),
        }
    }
}
