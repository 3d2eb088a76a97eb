use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{AppError, Result},
    models::pending::PendingAuth,
    store::kv::KvStore,
};

fn pending_key(state: &str) -> String {
    format!("pending:{}", state)
}

/// Authorization flows awaiting their callback, keyed by `state`.
#[derive(Clone)]
pub struct PendingAuthRepository {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl PendingAuthRepository {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn insert(&self, state: &str, pending: &PendingAuth) -> Result<()> {
        let json = sonic_rs::to_string(pending)
            .map_err(|e| AppError::Serialization(format!("Pending auth serialization failed: {}", e)))?;
        self.store
            .set(&pending_key(state), json, Some(self.ttl))
            .await
    }

    fn decode(json: String) -> Result<PendingAuth> {
        sonic_rs::from_str::<PendingAuth>(&json)
            .map_err(|e| AppError::Serialization(format!("Corrupt pending auth: {}", e)))
    }

    /// Reads the entry for `state` without consuming it.
    pub async fn get(&self, state: &str) -> Result<Option<PendingAuth>> {
        self.store
            .get(&pending_key(state))
            .await?
            .map(Self::decode)
            .transpose()
    }

    /// Removes and returns the entry for `state`; a second call yields `None`.
    pub async fn take(&self, state: &str) -> Result<Option<PendingAuth>> {
        self.store
            .take(&pending_key(state))
            .await?
            .map(Self::decode)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::provider::Provider;
    use crate::store::memory::MemoryStore;
    use uuid::Uuid;

    #[tokio::test(start_paused = true)]
    async fn pending_entries_are_one_shot_and_expire() {
        let repo = PendingAuthRepository::new(Arc::new(MemoryStore::new()), Duration::from_secs(600));
        let session_id = Uuid::new_v4();

        repo.insert(
            "s1",
            &PendingAuth::new(Provider::X, session_id).with_code_verifier("v".into()),
        )
        .await
        .unwrap();
        assert!(repo.get("s1").await.unwrap().is_some());
        assert!(repo.get("s1").await.unwrap().is_some());
        let taken = repo.take("s1").await.unwrap().unwrap();
        assert_eq!(taken.session_id, session_id);
        assert_eq!(taken.code_verifier.as_deref(), Some("v"));
        assert!(repo.take("s1").await.unwrap().is_none());

        repo.insert("s2", &PendingAuth::new(Provider::X, session_id))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(601)).await;
        assert!(repo.take("s2").await.unwrap().is_none());
    }
}
