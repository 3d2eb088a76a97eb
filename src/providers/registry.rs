use anyhow::{Context, Result};
use zeroize::Zeroizing;

use crate::models::provider::Provider;
use crate::providers::bluesky::BlueskyProvider;
use crate::providers::oauth2::{ClientAuth, OAuth2Provider};
use crate::providers::tumblr::TumblrProvider;

/// Reads one configuration variable; empty values count as unset.
pub type VarLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn var(get: VarLookup<'_>, key: &str) -> Option<String> {
    get(key).filter(|v| !v.trim().is_empty())
}

fn var_or(get: VarLookup<'_>, key: &str, default: &str) -> String {
    var(get, key).unwrap_or_else(|| default.to_string())
}

/// Static defaults for one OAuth 2.0 provider.
struct OAuth2Defaults {
    provider: Provider,
    env_prefix: &'static str,
    authorize_url: &'static str,
    token_url: &'static str,
    api_base: &'static str,
    scopes: &'static [&'static str],
    scope_separator: &'static str,
    pkce: bool,
    client_auth: ClientAuth,
    extra_params: &'static [(&'static str, &'static str)],
}

const PINTEREST: OAuth2Defaults = OAuth2Defaults {
    provider: Provider::Pinterest,
    env_prefix: "PINTEREST",
    authorize_url: "https://www.pinterest.com/oauth/",
    token_url: "https://api.pinterest.com/v5/oauth/token",
    api_base: "https://api.pinterest.com/v5",
    scopes: &["boards:read", "pins:read", "user_accounts:read"],
    scope_separator: ",",
    pkce: false,
    client_auth: ClientAuth::RequestBody,
    extra_params: &[],
};

const X: OAuth2Defaults = OAuth2Defaults {
    provider: Provider::X,
    env_prefix: "X",
    authorize_url: "https://twitter.com/i/oauth2/authorize",
    token_url: "https://api.twitter.com/2/oauth2/token",
    api_base: "https://api.twitter.com/2",
    scopes: &["tweet.read", "users.read", "offline.access"],
    scope_separator: " ",
    pkce: true,
    client_auth: ClientAuth::Basic,
    extra_params: &[],
};

const YOUTUBE: OAuth2Defaults = OAuth2Defaults {
    provider: Provider::YouTube,
    env_prefix: "YOUTUBE",
    authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
    token_url: "https://oauth2.googleapis.com/token",
    api_base: "https://www.googleapis.com/youtube/v3",
    scopes: &["https://www.googleapis.com/auth/youtube.readonly"],
    scope_separator: " ",
    pkce: false,
    client_auth: ClientAuth::RequestBody,
    extra_params: &[("access_type", "offline"), ("prompt", "consent")],
};

fn oauth2_from_vars(get: VarLookup<'_>, defaults: &OAuth2Defaults) -> Result<Option<OAuth2Provider>> {
    let prefix = defaults.env_prefix;
    let Some(client_id) = var(get, &format!("{prefix}_CLIENT_ID")) else {
        return Ok(None);
    };

    let redirect_uri = var(get, &format!("{prefix}_REDIRECT_URI"))
        .with_context(|| format!("{prefix}_REDIRECT_URI must be set when {prefix}_CLIENT_ID is"))?;

    Ok(Some(OAuth2Provider {
        provider: defaults.provider,
        client_id,
        client_secret: var(get, &format!("{prefix}_CLIENT_SECRET")).map(Zeroizing::new),
        redirect_uri,
        authorize_url: var_or(get, &format!("{prefix}_AUTHORIZE_URL"), defaults.authorize_url),
        token_url: var_or(get, &format!("{prefix}_TOKEN_URL"), defaults.token_url),
        api_base: var_or(get, &format!("{prefix}_API_BASE"), defaults.api_base),
        scopes: defaults.scopes.iter().map(|s| s.to_string()).collect(),
        scope_separator: defaults.scope_separator,
        pkce: defaults.pkce,
        client_auth: defaults.client_auth,
        extra_params: defaults.extra_params.to_vec(),
    }))
}

fn tumblr_from_vars(get: VarLookup<'_>) -> Result<Option<TumblrProvider>> {
    let Some(consumer_key) = var(get, "TUMBLR_CONSUMER_KEY") else {
        return Ok(None);
    };

    Ok(Some(TumblrProvider {
        consumer_key,
        consumer_secret: Zeroizing::new(
            var(get, "TUMBLR_CONSUMER_SECRET")
                .context("TUMBLR_CONSUMER_SECRET must be set when TUMBLR_CONSUMER_KEY is")?,
        ),
        callback_url: var(get, "TUMBLR_CALLBACK_URL")
            .context("TUMBLR_CALLBACK_URL must be set when TUMBLR_CONSUMER_KEY is")?,
        request_token_url: var_or(
            get,
            "TUMBLR_REQUEST_TOKEN_URL",
            "https://www.tumblr.com/oauth/request_token",
        ),
        authorize_url: var_or(
            get,
            "TUMBLR_AUTHORIZE_URL",
            "https://www.tumblr.com/oauth/authorize",
        ),
        access_token_url: var_or(
            get,
            "TUMBLR_ACCESS_TOKEN_URL",
            "https://www.tumblr.com/oauth/access_token",
        ),
        api_base: var_or(get, "TUMBLR_API_BASE", "https://api.tumblr.com/v2"),
    }))
}

/// The per-provider configuration table. Providers without credentials are `None`
/// and answer 404 on their `/auth` routes.
#[derive(Clone)]
pub struct ProviderRegistry {
    pub pinterest: Option<OAuth2Provider>,
    pub x: Option<OAuth2Provider>,
    pub youtube: Option<OAuth2Provider>,
    pub tumblr: Option<TumblrProvider>,
    pub bluesky: BlueskyProvider,
}

impl ProviderRegistry {
    pub fn from_vars(get: VarLookup<'_>) -> Result<Self> {
        Ok(Self {
            pinterest: oauth2_from_vars(get, &PINTEREST)?,
            x: oauth2_from_vars(get, &X)?,
            youtube: oauth2_from_vars(get, &YOUTUBE)?,
            tumblr: tumblr_from_vars(get)?,
            bluesky: BlueskyProvider {
                service: var_or(get, "BLUESKY_SERVICE", "https://bsky.social"),
            },
        })
    }

    /// The OAuth 2.0 table row for `provider`, if it is configured.
    pub fn oauth2(&self, provider: Provider) -> Option<&OAuth2Provider> {
        match provider {
            Provider::Pinterest => self.pinterest.as_ref(),
            Provider::X => self.x.as_ref(),
            Provider::YouTube => self.youtube.as_ref(),
            Provider::Tumblr | Provider::Bluesky => None,
        }
    }

    pub fn is_enabled(&self, provider: Provider) -> bool {
        match provider {
            Provider::Tumblr => self.tumblr.is_some(),
            Provider::Bluesky => true,
            other => self.oauth2(other).is_some(),
        }
    }

    /// REST base URL for `provider`, falling back to the public default when the
    /// provider's app is not configured (the token may still be in the session).
    pub fn api_base(&self, provider: Provider) -> String {
        match provider {
            Provider::Pinterest => self
                .pinterest
                .as_ref()
                .map_or(PINTEREST.api_base.to_string(), |p| p.api_base.clone()),
            Provider::X => self
                .x
                .as_ref()
                .map_or(X.api_base.to_string(), |p| p.api_base.clone()),
            Provider::YouTube => self
                .youtube
                .as_ref()
                .map_or(YOUTUBE.api_base.to_string(), |p| p.api_base.clone()),
            Provider::Tumblr => self
                .tumblr
                .as_ref()
                .map_or("https://api.tumblr.com/v2".to_string(), |p| p.api_base.clone()),
            Provider::Bluesky => self.bluesky.service.clone(),
        }
    }
}
