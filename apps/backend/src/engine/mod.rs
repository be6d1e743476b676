// state store -> broadcast hub -> subscribers
// operator edits and clock ticks both commit through the store

pub mod clock;
pub mod gateway;
pub mod hub;
pub mod recorder;
pub mod store;

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::errors::Result;
use crate::models::api::ServerMessage;
use crate::models::domain::{
    ClockAction, ClockPreset, ClockReport, ClockState, FieldUpdate, Origin, Session, SessionCode,
    SignalKind,
};
use clock::{ClockScheduler, DEFAULT_TICK_PERIOD};
use gateway::UpdateGateway;
use hub::{BroadcastHub, Connection, ConnectionId};
use store::{CommitSink, SessionStore};

/// Runtime knobs for the engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Starting clocks for sessions created without explicit values
    pub preset: ClockPreset,
    pub tick_period: Duration,
    pub outbox_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            preset: ClockPreset::default(),
            tick_period: DEFAULT_TICK_PERIOD,
            outbox_capacity: 64,
        }
    }
}

/// The live synchronization core: every inbound operation goes through here
pub struct Scoreboard {
    store: Arc<SessionStore>,
    hub: Arc<BroadcastHub>,
    clock: ClockScheduler,
    gateway: UpdateGateway,
    settings: EngineSettings,
}

impl Scoreboard {
    /// In-memory scoreboard with no extra commit sinks
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_sinks(settings, Vec::new())
    }

    /// Scoreboard whose commits also flow to `sinks` (after the broadcast hub)
    pub fn with_sinks(settings: EngineSettings, sinks: Vec<Arc<dyn CommitSink>>) -> Self {
        let hub = Arc::new(BroadcastHub::new());

        let mut all_sinks: Vec<Arc<dyn CommitSink>> = vec![hub.clone() as Arc<dyn CommitSink>];
        all_sinks.extend(sinks);

        let store = Arc::new(SessionStore::new(all_sinks));

        Self {
            clock: ClockScheduler::new(Arc::clone(&store), settings.tick_period),
            gateway: UpdateGateway::new(Arc::clone(&store)),
            store,
            hub,
            settings,
        }
    }

    /// Reload persisted sessions. Clocks come back idle.
    pub async fn restore(&self, sessions: Vec<Session>) -> usize {
        let restored = self.store.restore(sessions).await;
        if restored > 0 {
            log::info!("Restored {} sessions", restored);
        }
        restored
    }

    /// Create a session. `fields` may override any updatable field; clock values
    /// given here also become the session's reset preset.
    pub async fn create_session(&self, code: &str, fields: &Map<String, Value>) -> Result<Session> {
        let code = SessionCode::parse(code)?;
        let updates = if fields.is_empty() {
            Vec::new()
        } else {
            FieldUpdate::parse_all(fields)?
        };

        let mut preset = self.settings.preset;
        for update in &updates {
            match update {
                FieldUpdate::GameClock(clock) => preset.game_clock = *clock,
                FieldUpdate::ShotClock(seconds) => preset.shot_clock = *seconds,
                _ => {}
            }
        }

        let mut session = Session::new(code, preset);
        for update in &updates {
            session.apply(update);
        }

        let session = self.store.create(session).await?;
        log::info!("Created session {}", session.code);
        Ok(session)
    }

    pub async fn get_session(&self, code: &str) -> Result<Session> {
        let code = SessionCode::parse(code)?;
        self.store.get(&code).await
    }

    /// Open a connection whose outbox can be joined to broadcast groups
    pub fn open_connection(&self) -> (Connection, mpsc::Receiver<ServerMessage>) {
        Connection::open(self.settings.outbox_capacity)
    }

    /// Join `connection` to the group for `code` and queue a `joined` message
    /// with the current snapshot. Done under the session lock so the joiner's
    /// first message always precedes any later snapshot.
    ///
    /// Joining again is a no-op: no second membership and no second `joined`.
    pub async fn join_broadcast(&self, code: &str, connection: Connection) -> Result<Session> {
        let code = SessionCode::parse(code)?;
        let slot = self.store.lock(&code).await?;

        if self.hub.join(&code, connection.clone()) {
            connection.deliver(ServerMessage::Joined {
                session: slot.session.clone(),
            });
        } else {
            log::debug!("Connection {} already joined {}", connection.id(), code);
        }

        Ok(slot.session.clone())
    }

    /// Leave is idempotent and does not require the session to exist
    pub fn leave_broadcast(&self, code: &str, connection: ConnectionId) -> Result<bool> {
        let code = SessionCode::parse(code)?;
        Ok(self.hub.leave(&code, connection))
    }

    /// Drop every membership of a closed connection
    pub fn disconnect(&self, connection: ConnectionId) -> Vec<SessionCode> {
        self.hub.leave_all(connection)
    }

    pub async fn submit_update(
        &self,
        code: &str,
        fields: &Map<String, Value>,
        origin: &Origin,
    ) -> Result<Session> {
        let code = SessionCode::parse(code)?;
        self.gateway.submit(&code, fields, origin).await
    }

    pub async fn clock_action(&self, code: &str, action: ClockAction) -> Result<ClockReport> {
        let code = SessionCode::parse(code)?;
        self.clock.action(&code, action).await
    }

    pub async fn clock_state(&self, code: &str) -> Result<ClockState> {
        let code = SessionCode::parse(code)?;
        self.clock.state(&code).await
    }

    /// Fan a signal out to the session's subscribers without touching state.
    /// Returns how many connections it was queued for.
    pub async fn signal(&self, code: &str, signal: SignalKind) -> Result<usize> {
        let code = SessionCode::parse(code)?;
        // Held so the signal is ordered with snapshots of the same session
        let _slot = self.store.lock(&code).await?;

        let delivered = self.hub.publish(
            &code,
            ServerMessage::Signal {
                code: code.clone(),
                signal,
            },
        );
        log::debug!("Signal {:?} on {} queued for {} connections", signal, code, delivered);
        Ok(delivered)
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}
