use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::session::Session,
    store::kv::KvStore,
};

fn session_key(id: &Uuid) -> String {
    format!("session:{}", id)
}

/// Server-side session records.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn KvStore>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Loads a live session. Expired or unreadable records are dropped.
    pub async fn load(&self, id: &Uuid) -> Result<Option<Session>> {
        let Some(json) = self.store.get(&session_key(id)).await? else {
            return Ok(None);
        };

        let session: Session = match sonic_rs::from_str(&json) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("❌ Invalid session JSON for {}: {}", id, e);
                self.store.delete(&session_key(id)).await?;
                return Ok(None);
            }
        };

        if session.is_expired() {
            tracing::debug!("Session {} expired", id);
            self.store.delete(&session_key(id)).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Writes the session; its store TTL follows `expires_at`.
    pub async fn save(&self, session: &Session) -> Result<()> {
        let json = sonic_rs::to_string(session)
            .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;

        let remaining = (session.expires_at - chrono::Utc::now())
            .to_std()
            .unwrap_or(Duration::from_secs(1));

        self.store
            .set(&session_key(&session.id), json, Some(remaining))
            .await
    }

    pub async fn destroy(&self, id: &Uuid) -> Result<()> {
        self.store.delete(&session_key(id)).await
    }
}
