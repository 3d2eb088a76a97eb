use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::models::provider::Provider;

/// An authorization flow that was started but whose callback has not arrived yet.
///
/// Keyed in the store by the OAuth 2.0 `state` (or the OAuth 1.0a request token).
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PendingAuth {
    #[zeroize(skip)]
    pub provider: Provider,
    /// Session that started the flow; the callback must arrive on the same one.
    #[zeroize(skip)]
    pub session_id: Uuid,
    /// PKCE verifier, for providers that use PKCE.
    pub code_verifier: Option<String>,
    /// OAuth 1.0a request token secret.
    pub token_secret: Option<String>,
    #[zeroize(skip)]
    pub created_at: DateTime<Utc>,
}

impl PendingAuth {
    pub fn new(provider: Provider, session_id: Uuid) -> Self {
        Self {
            provider,
            session_id,
            code_verifier: None,
            token_secret: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_code_verifier(mut self, verifier: String) -> Self {
        self.code_verifier = Some(verifier);
        self
    }

    pub fn with_token_secret(mut self, secret: String) -> Self {
        self.token_secret = Some(secret);
        self
    }
}

impl std::fmt::Debug for PendingAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAuth")
            .field("provider", &self.provider)
            .field("session_id", &self.session_id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
