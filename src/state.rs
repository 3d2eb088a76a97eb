use sha2::{Digest, Sha512};
use std::sync::Arc;
use std::time::Duration;
use tower_cookies::Key;

use crate::config::Config;
use crate::error::Result;
use crate::repositories::{
    pending::PendingAuthRepository, session::SessionRepository, user::UserRepository,
};
use crate::store::{kv::KvStore, memory::MemoryStore, redis::RedisStore};

/// Timeout for every outbound provider request.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// Backing store for sessions, pending authorizations and accounts.
    pub store: Arc<dyn KvStore>,
    pub users: UserRepository,
    pub sessions: SessionRepository,
    pub pending: PendingAuthRepository,
    /// Shared client for provider calls.
    pub http: reqwest::Client,
    /// Signing key for the session cookie.
    pub cookie_key: Key,
}

/// Derives the 64-byte cookie key from `SESSION_SECRET`.
fn cookie_key(secret: &str) -> Key {
    Key::from(&Sha512::digest(secret.as_bytes()))
}

impl AppState {
    /// Creates a new `AppState`, connecting to Redis when `REDIS_URL` is set.
    pub async fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn KvStore> = match &config.redis_url {
            Some(url) => {
                let store = RedisStore::connect(url).await?;
                tracing::info!("✅ Redis Connection Manager initialized");
                Arc::new(store)
            }
            None => {
                tracing::info!("✅ In-memory store initialized (contents are lost on restart)");
                Arc::new(MemoryStore::new())
            }
        };

        Self::with_store(config.clone(), store)
    }

    /// Builds the state around an existing store.
    pub fn with_store(config: Config, store: Arc<dyn KvStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(AppState {
            users: UserRepository::new(store.clone()),
            sessions: SessionRepository::new(store.clone()),
            pending: PendingAuthRepository::new(store.clone(), config.pending_auth_ttl),
            cookie_key: cookie_key(&config.session_secret),
            config: Arc::new(config),
            store,
            http,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_key_is_stable_per_secret() {
        let a = cookie_key("0123456789abcdef0123456789abcdef");
        let b = cookie_key("0123456789abcdef0123456789abcdef");
        let c = cookie_key("fedcba9876543210fedcba9876543210");
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}
