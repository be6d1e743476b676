//! Authoritative per-session state
//!
//! Every session lives behind its own mutex, so writers on different codes never
//! wait on each other. The outer map lock is only held long enough to look up or
//! insert a slot.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::errors::{Result, ScoreboardError};
use crate::models::domain::{FieldUpdate, Session, SessionCode};

/// Why a snapshot is being committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    Created,
    Updated,
    Tick,
    Reset,
}

/// Receives every committed snapshot while the session lock is still held,
/// so sinks observe commits of one session in commit order.
///
/// Implementations must only enqueue; they must never block or await I/O.
pub trait CommitSink: Send + Sync {
    fn committed(&self, kind: CommitKind, session: &Session);
}

// ============================================================================
// TimerSlot - Timer Handle bookkeeping owned by the session
// ============================================================================

/// Generation counter for the session's countdown timer.
///
/// `live` holds the epoch of the one timer allowed to tick; a timer task whose
/// epoch no longer matches is stale and must exit without touching the session.
#[derive(Debug, Default)]
pub(crate) struct TimerSlot {
    epoch: u64,
    live: Option<u64>,
}

impl TimerSlot {
    /// Issue a fresh epoch and make it the live one
    pub(crate) fn arm(&mut self) -> u64 {
        self.epoch += 1;
        self.live = Some(self.epoch);
        self.epoch
    }

    /// Release the live handle. Returns true if one was live.
    pub(crate) fn cancel(&mut self) -> bool {
        self.live.take().is_some()
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.live == Some(epoch)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.live.is_some()
    }
}

pub(crate) struct SessionSlot {
    pub(crate) session: Session,
    pub(crate) timer: TimerSlot,
}

// ============================================================================
// SessionStore
// ============================================================================

pub struct SessionStore {
    sessions: RwLock<HashMap<SessionCode, Arc<Mutex<SessionSlot>>>>,
    sinks: Vec<Arc<dyn CommitSink>>,
}

impl SessionStore {
    pub fn new(sinks: Vec<Arc<dyn CommitSink>>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            sinks,
        }
    }

    /// Insert a new session. Fails if the code is taken.
    pub async fn create(&self, session: Session) -> Result<Session> {
        let code = session.code.clone();
        let cell = Arc::new(Mutex::new(SessionSlot {
            session,
            timer: TimerSlot::default(),
        }));
        // Nobody else can see the cell yet, so this never waits
        let slot = cell.clone().lock_owned().await;

        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&code) {
                return Err(ScoreboardError::SessionAlreadyExists {
                    code: code.to_string(),
                });
            }
            sessions.insert(code, cell);
        }

        self.notify(CommitKind::Created, &slot.session);
        Ok(slot.session.clone())
    }

    /// Load previously persisted sessions without notifying sinks.
    /// Codes already present are left untouched.
    pub async fn restore(&self, sessions: Vec<Session>) -> usize {
        let mut map = self.sessions.write().await;
        let mut restored = 0;
        for session in sessions {
            if map.contains_key(&session.code) {
                continue;
            }
            map.insert(
                session.code.clone(),
                Arc::new(Mutex::new(SessionSlot {
                    session,
                    timer: TimerSlot::default(),
                })),
            );
            restored += 1;
        }
        restored
    }

    pub async fn get(&self, code: &SessionCode) -> Result<Session> {
        let slot = self.lock(code).await?;
        Ok(slot.session.clone())
    }

    pub async fn contains(&self, code: &SessionCode) -> bool {
        self.sessions.read().await.contains_key(code)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Apply a batch of validated updates atomically and commit the result.
    ///
    /// Setting `ended` also releases a running timer in the same critical section.
    pub async fn apply(&self, code: &SessionCode, updates: &[FieldUpdate]) -> Result<Session> {
        let mut slot = self.lock(code).await?;

        let mut changed = false;
        for update in updates {
            changed |= slot.session.apply(update);
        }

        if slot.session.ended && slot.timer.cancel() {
            log::info!("Session {} ended, clock stopped", code);
        }

        self.commit(CommitKind::Updated, &mut slot.session, changed);
        Ok(slot.session.clone())
    }

    /// Exclusive access to one session's slot
    pub(crate) async fn lock(&self, code: &SessionCode) -> Result<OwnedMutexGuard<SessionSlot>> {
        let cell = {
            let sessions = self.sessions.read().await;
            sessions
                .get(code)
                .cloned()
                .ok_or_else(|| ScoreboardError::SessionNotFound {
                    code: code.to_string(),
                })?
        };
        // Map lock is released before waiting on the session lock
        Ok(cell.lock_owned().await)
    }

    /// Bump the revision if anything changed, then hand the snapshot to every sink.
    /// Callers hold the session lock.
    pub(crate) fn commit(&self, kind: CommitKind, session: &mut Session, changed: bool) {
        if changed {
            session.revision += 1;
        }
        self.notify(kind, session);
    }

    fn notify(&self, kind: CommitKind, session: &Session) {
        for sink in &self.sinks {
            sink.committed(kind, session);
        }
    }
}
