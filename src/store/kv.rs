use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// String key-value storage with optional per-entry expiry.
///
/// Everything the server keeps between requests (sessions, pending
/// authorizations, demo accounts) goes through this trait so the backend can
/// be swapped without touching the repositories.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the live value under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value`, replacing any previous entry.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Writes `value` only if `key` holds no live entry. Returns whether it was written.
    async fn insert_if_absent(&self, key: &str, value: String, ttl: Option<Duration>)
        -> Result<bool>;

    /// Atomically reads and removes the entry under `key`.
    async fn take(&self, key: &str) -> Result<Option<String>>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Drops expired entries. Backends with native expiry can leave this as a no-op.
    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}
