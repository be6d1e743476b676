//! Broadcast groups keyed by session code
//!
//! Publishing only enqueues into each connection's bounded outbox; the socket
//! writer task owned by the connection performs the actual network send. A full
//! outbox drops the message for that subscriber alone, a closed one is pruned.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::store::{CommitKind, CommitSink};
use crate::models::api::ServerMessage;
use crate::models::domain::{Session, SessionCode};

pub type ConnectionId = Uuid;

/// A viewer's live channel: an id plus the outbox its writer task drains
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    outbox: mpsc::Sender<ServerMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    Dropped,
    Closed,
}

impl Connection {
    /// Create a connection with a fresh id and an outbox of `capacity` messages
    pub fn open(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (outbox, inbox) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: Uuid::new_v4(),
                outbox,
            },
            inbox,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Non-blocking enqueue
    pub fn deliver(&self, message: ServerMessage) -> Delivery {
        match self.outbox.try_send(message) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

type Groups = HashMap<SessionCode, HashMap<ConnectionId, Connection>>;

#[derive(Default)]
pub struct BroadcastHub {
    groups: RwLock<Groups>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection` to the group for `code`.
    /// Returns true if it was added, false if it was already a member.
    pub fn join(&self, code: &SessionCode, connection: Connection) -> bool {
        let mut groups = self.write();
        let group = groups.entry(code.clone()).or_default();
        let added = group.insert(connection.id, connection).is_none();
        if added {
            log::debug!("Connection joined {} ({} subscribers)", code, group.len());
        }
        added
    }

    /// Remove `connection` from the group for `code`.
    /// Returns true if it was removed, false if it was not a member.
    pub fn leave(&self, code: &SessionCode, connection: ConnectionId) -> bool {
        let mut groups = self.write();
        let Some(group) = groups.get_mut(code) else {
            return false;
        };
        let removed = group.remove(&connection).is_some();
        if group.is_empty() {
            groups.remove(code);
        }
        if removed {
            log::debug!("Connection left {}", code);
        }
        removed
    }

    /// Drop every membership held by `connection`; used when its socket closes
    pub fn leave_all(&self, connection: ConnectionId) -> Vec<SessionCode> {
        let mut groups = self.write();
        let mut left = Vec::new();
        groups.retain(|code, group| {
            if group.remove(&connection).is_some() {
                left.push(code.clone());
            }
            !group.is_empty()
        });
        left
    }

    /// Queue `message` for every connection joined to `code`.
    /// Returns the number of connections it was queued for.
    pub fn publish(&self, code: &SessionCode, message: ServerMessage) -> usize {
        let mut queued = 0;
        let mut closed = Vec::new();

        {
            let groups = self.read();
            let Some(group) = groups.get(code) else {
                return 0;
            };

            for connection in group.values() {
                match connection.deliver(message.clone()) {
                    Delivery::Queued => queued += 1,
                    Delivery::Dropped => {
                        log::warn!("Outbox full, dropping message for {} on {}", connection.id, code);
                    }
                    Delivery::Closed => closed.push(connection.id),
                }
            }
        }

        for id in closed {
            log::debug!("Pruning closed connection {} from {}", id, code);
            self.leave(code, id);
        }

        queued
    }

    pub fn subscriber_count(&self, code: &SessionCode) -> usize {
        self.read().get(code).map_or(0, HashMap::len)
    }

    pub fn is_joined(&self, code: &SessionCode, connection: ConnectionId) -> bool {
        self.read()
            .get(code)
            .is_some_and(|group| group.contains_key(&connection))
    }

    // Critical sections never panic, so a poisoned lock still holds consistent data
    fn read(&self) -> RwLockReadGuard<'_, Groups> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Groups> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CommitSink for BroadcastHub {
    fn committed(&self, kind: CommitKind, session: &Session) {
        // A brand new session has no subscribers yet
        if kind == CommitKind::Created {
            return;
        }
        self.publish(
            &session.code,
            ServerMessage::Snapshot {
                session: session.clone(),
            },
        );
    }
}
