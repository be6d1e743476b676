//! WebSocket connection state management

use std::collections::HashSet;
use tokio::time::Instant;

use crate::models::domain::SessionCode;

/// Shared state for a WebSocket connection
pub(crate) struct SocketState {
    pub(crate) joined: JoinedSet,
    pub(crate) last_pong: Instant,
    pub(crate) last_membership_change: Instant,
}

impl SocketState {
    pub(crate) fn new() -> Self {
        Self {
            joined: JoinedSet::default(),
            last_pong: Instant::now(),
            last_membership_change: Instant::now(),
        }
    }
}

/// Sessions this socket has joined, mirrored locally so the idle check does
/// not need to ask the hub
#[derive(Debug, Default)]
pub(crate) struct JoinedSet {
    codes: HashSet<SessionCode>,
}

impl JoinedSet {
    pub(crate) fn insert(&mut self, code: SessionCode) -> bool {
        self.codes.insert(code)
    }

    pub(crate) fn remove(&mut self, code: &SessionCode) -> bool {
        self.codes.remove(code)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
