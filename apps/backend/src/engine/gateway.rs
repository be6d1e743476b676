//! Operator write path: validate, then apply through the store

use serde_json::{Map, Value};
use std::sync::Arc;

use super::store::SessionStore;
use crate::errors::{Result, ScoreboardError};
use crate::models::domain::{FieldUpdate, Origin, Session, SessionCode};

pub struct UpdateGateway {
    store: Arc<SessionStore>,
}

impl UpdateGateway {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Validate every field first; a rejected update leaves the session untouched.
    /// On success the store commits and the snapshot is published to subscribers.
    pub async fn submit(
        &self,
        code: &SessionCode,
        fields: &Map<String, Value>,
        origin: &Origin,
    ) -> Result<Session> {
        if !self.store.contains(code).await {
            return Err(ScoreboardError::SessionNotFound {
                code: code.to_string(),
            });
        }

        let updates = FieldUpdate::parse_all(fields).inspect_err(|e| {
            log::debug!("Rejected update on {} from {}: {}", code, origin, e);
        })?;

        let session = self.store.apply(code, &updates).await?;

        log::info!(
            "{} updated {} [{}] (revision {})",
            origin,
            code,
            updates
                .iter()
                .map(FieldUpdate::field_name)
                .collect::<Vec<_>>()
                .join(", "),
            session.revision
        );

        Ok(session)
    }
}
