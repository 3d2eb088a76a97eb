use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::models::provider::Provider;

/// Tokens returned by an OAuth 2.0 code exchange.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct OAuth2Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds as reported by the provider.
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    #[zeroize(skip)]
    pub obtained_at: DateTime<Utc>,
}

/// An OAuth 1.0a access token pair (Tumblr).
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct OAuth1Credential {
    pub token: String,
    pub token_secret: String,
}

/// An AT-protocol session created with an app password.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct BlueskyCredential {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
    /// PDS base URL the session was created against.
    pub service: String,
}

// Secrets stay out of logs.
macro_rules! redacted_debug {
    ($ty:ty $(, $field:ident)*) => {
        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty))
                    $(.field(stringify!($field), &self.$field))*
                    .finish_non_exhaustive()
            }
        }
    };
}

redacted_debug!(OAuth2Credential, expires_in, scope, obtained_at);
redacted_debug!(OAuth1Credential);
redacted_debug!(BlueskyCredential, did, handle, service);

/// One optional credential slot per provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub pinterest: Option<OAuth2Credential>,
    pub x: Option<OAuth2Credential>,
    pub youtube: Option<OAuth2Credential>,
    pub tumblr: Option<OAuth1Credential>,
    pub bluesky: Option<BlueskyCredential>,
}

impl ProviderCredentials {
    /// The OAuth 2.0 credential for `provider`, if it is an OAuth 2.0 provider and connected.
    pub fn oauth2(&self, provider: Provider) -> Option<&OAuth2Credential> {
        match provider {
            Provider::Pinterest => self.pinterest.as_ref(),
            Provider::X => self.x.as_ref(),
            Provider::YouTube => self.youtube.as_ref(),
            Provider::Tumblr | Provider::Bluesky => None,
        }
    }

    /// Stores an OAuth 2.0 credential. Returns `false` if `provider` does not use OAuth 2.0.
    pub fn set_oauth2(&mut self, provider: Provider, credential: OAuth2Credential) -> bool {
        let slot = match provider {
            Provider::Pinterest => &mut self.pinterest,
            Provider::X => &mut self.x,
            Provider::YouTube => &mut self.youtube,
            Provider::Tumblr | Provider::Bluesky => return false,
        };
        *slot = Some(credential);
        true
    }

    pub fn is_connected(&self, provider: Provider) -> bool {
        match provider {
            Provider::Tumblr => self.tumblr.is_some(),
            Provider::Bluesky => self.bluesky.is_some(),
            other => self.oauth2(other).is_some(),
        }
    }

    pub fn connected(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.is_connected(*p))
            .collect()
    }

    pub fn clear(&mut self, provider: Provider) {
        match provider {
            Provider::Pinterest => self.pinterest = None,
            Provider::X => self.x = None,
            Provider::YouTube => self.youtube = None,
            Provider::Tumblr => self.tumblr = None,
            Provider::Bluesky => self.bluesky = None,
        }
    }
}

/// A server-side session, addressed by the id carried in the signed `session_id` cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// The local account logged into this session, if any.
    pub user_id: Option<Uuid>,
    /// Anti-CSRF nonce of the authorization flow in progress.
    pub oauth_state: Option<String>,
    pub credentials: ProviderCredentials,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: None,
            oauth_state: None,
            credentials: ProviderCredentials::default(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(token: &str) -> OAuth2Credential {
        OAuth2Credential {
            access_token: token.to_string(),
            refresh_token: None,
            expires_in: Some(3600),
            scope: None,
            obtained_at: Utc::now(),
        }
    }

    #[test]
    fn oauth2_slots_are_per_provider() {
        let mut creds = ProviderCredentials::default();
        assert!(creds.set_oauth2(Provider::X, credential("x-token")));
        assert!(!creds.set_oauth2(Provider::Tumblr, credential("nope")));

        assert_eq!(creds.oauth2(Provider::X).unwrap().access_token, "x-token");
        assert!(creds.oauth2(Provider::Pinterest).is_none());
        assert_eq!(creds.connected(), vec![Provider::X]);

        creds.clear(Provider::X);
        assert!(creds.connected().is_empty());
    }

    #[test]
    fn debug_output_hides_tokens() {
        let rendered = format!("{:?}", credential("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
