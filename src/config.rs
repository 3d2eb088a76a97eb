use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

use crate::providers::registry::{ProviderRegistry, VarLookup};

/// Minimum length of `SESSION_SECRET`.
const MIN_SESSION_SECRET_LEN: usize = 32;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The dashboard origin allowed by CORS.
    pub frontend_origin: String,
    /// Where the browser lands after a successful provider callback.
    pub post_login_redirect: String,
    /// Secret the session cookie signing key is derived from.
    pub session_secret: Zeroizing<String>,
    /// The lifetime of a session.
    pub session_ttl: Duration,
    /// How long a started authorization flow waits for its callback.
    pub pending_auth_ttl: Duration,
    /// Redis URL; the in-memory store is used when unset.
    pub redis_url: Option<String>,
    /// Whether cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
    /// Per-provider applications and endpoints.
    pub providers: ProviderRegistry,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&|key| env::var(key).ok())
    }

    /// Creates a new `Config` from an arbitrary variable source.
    pub fn from_vars(get: VarLookup<'_>) -> Result<Self> {
        let lookup = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let host: IpAddr = lookup("HOST")
            .unwrap_or_else(|| "127.0.0.1".to_string())
            .parse()
            .context("Invalid HOST")?;
        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .context("Invalid PORT")?;

        let session_secret = Zeroizing::new(
            lookup("SESSION_SECRET")
                .context("SESSION_SECRET must be set (generate with: openssl rand -hex 32)")?,
        );
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            anyhow::bail!("SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} characters");
        }

        let session_ttl_hours: u64 = lookup("SESSION_TTL_HOURS")
            .unwrap_or_else(|| "24".to_string())
            .parse()
            .context("Invalid SESSION_TTL_HOURS")?;
        let pending_auth_ttl_secs: u64 = lookup("PENDING_AUTH_TTL_SECS")
            .unwrap_or_else(|| "600".to_string())
            .parse()
            .context("Invalid PENDING_AUTH_TTL_SECS")?;

        let frontend_origin = lookup("FRONTEND_ORIGIN")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();
        let post_login_redirect = lookup("POST_LOGIN_REDIRECT")
            .unwrap_or_else(|| format!("{}/dashboard", frontend_origin));

        let session_ttl_secs = session_ttl_hours
            .checked_mul(3600)
            .context("SESSION_TTL_HOURS is too large")?;

        let is_production = lookup("APP_ENV").as_deref() == Some("production");

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            frontend_origin,
            post_login_redirect,
            session_secret,
            session_ttl: Duration::from_secs(session_ttl_secs),
            pending_auth_ttl: Duration::from_secs(pending_auth_ttl_secs),
            redis_url: lookup("REDIS_URL"),
            secure_cookies: is_production,
            providers: ProviderRegistry::from_vars(get)?,
        })
    }
}
