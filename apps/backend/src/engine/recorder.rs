//! Write-behind persistence of committed snapshots

use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::store::{CommitKind, CommitSink};
use crate::db::Db;
use crate::models::domain::{Session, SessionCode};

/// Commit sink that hands snapshots to a background writer
pub struct SessionRecorder {
    tx: mpsc::UnboundedSender<Session>,
}

impl SessionRecorder {
    /// Spawn the writer task. It runs until every recorder handle is dropped.
    pub fn spawn(db: Db) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_recorder(db, rx));
        (Self { tx }, handle)
    }
}

impl CommitSink for SessionRecorder {
    fn committed(&self, _kind: CommitKind, session: &Session) {
        if self.tx.send(session.clone()).is_err() {
            log::warn!("Recorder stopped, snapshot of {} not persisted", session.code);
        }
    }
}

async fn run_recorder(db: Db, mut rx: mpsc::UnboundedReceiver<Session>) {
    while let Some(first) = rx.recv().await {
        // Coalesce whatever queued up behind it, keeping the newest snapshot per code
        let mut latest: HashMap<SessionCode, Session> = HashMap::new();
        let mut next = Some(first);
        while let Some(session) = next {
            match latest.get(&session.code) {
                Some(existing) if existing.revision > session.revision => {}
                _ => {
                    latest.insert(session.code.clone(), session);
                }
            }
            next = rx.try_recv().ok();
        }

        for session in latest.into_values() {
            if let Err(e) = db.upsert_session(&session).await {
                log::error!("Failed to persist session {}: {}", session.code, e);
            }
        }
    }

    log::info!("Session recorder stopped");
}
