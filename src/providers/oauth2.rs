use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::error::{AppError, Result};
use crate::models::provider::Provider;
use crate::models::session::OAuth2Credential;

/// How the client authenticates itself at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuth {
    /// HTTP Basic with `client_id:client_secret`; falls back to the form body
    /// when no secret is configured (public PKCE clients).
    Basic,
    /// `client_id` / `client_secret` as form fields.
    RequestBody,
}

/// One row of the OAuth 2.0 provider table: everything the shared
/// authorization-code flow needs to talk to a provider.
#[derive(Clone)]
pub struct OAuth2Provider {
    pub provider: Provider,
    pub client_id: String,
    pub client_secret: Option<Zeroizing<String>>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    /// Base URL of the provider's REST API.
    pub api_base: String,
    pub scopes: Vec<String>,
    pub scope_separator: &'static str,
    pub pkce: bool,
    pub client_auth: ClientAuth,
    /// Provider-specific authorization parameters (e.g. Google's `access_type`).
    pub extra_params: Vec<(&'static str, &'static str)>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
}

impl OAuth2Provider {
    /// Builds the URL the browser is redirected to.
    pub fn authorization_url(&self, state: &str, code_challenge: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.authorize_url).map_err(|e| {
            AppError::Internal(format!("Invalid {} authorize URL: {}", self.provider, e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("scope", &self.scopes.join(self.scope_separator))
                .append_pair("state", state);

            if let Some(challenge) = code_challenge {
                query
                    .append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", "S256");
            }

            for (key, value) in &self.extra_params {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Exchanges an authorization code for tokens with a single POST to the token endpoint.
    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuth2Credential> {
        let mut form: Vec<(&str, String)> = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", self.redirect_uri.clone()),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier.to_string()));
        }

        let mut request = http
            .post(&self.token_url)
            .header(ACCEPT, "application/json");

        match (self.client_auth, &self.client_secret) {
            (ClientAuth::Basic, Some(secret)) => {
                request = request.basic_auth(&self.client_id, Some(secret.as_str()));
            }
            (_, secret) => {
                form.push(("client_id", self.client_id.clone()));
                if let Some(secret) = secret {
                    form.push(("client_secret", secret.to_string()));
                }
            }
        }

        tracing::debug!("🔁 Exchanging {} authorization code", self.provider);
        let response = request.form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                "❌ {} token exchange failed ({}): {}",
                self.provider.display_name(),
                status,
                body
            );
            return Err(AppError::Upstream {
                provider: self.provider,
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        tracing::info!("✅ {} token obtained", self.provider.display_name());

        Ok(OAuth2Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            scope: token.scope,
            obtained_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn provider(pkce: bool, separator: &'static str) -> OAuth2Provider {
        OAuth2Provider {
            provider: Provider::Pinterest,
            client_id: "client-123".into(),
            client_secret: Some(Zeroizing::new("shh".into())),
            redirect_uri: "http://localhost:3000/auth/pinterest/callback".into(),
            authorize_url: "https://www.pinterest.com/oauth/".into(),
            token_url: "https://api.pinterest.com/v5/oauth/token".into(),
            api_base: "https://api.pinterest.com/v5".into(),
            scopes: vec!["boards:read".into(), "pins:read".into()],
            scope_separator: separator,
            pkce,
            client_auth: ClientAuth::RequestBody,
            extra_params: vec![("access_type", "offline")],
        }
    }

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn authorization_url_carries_state_and_scopes() {
        let url = provider(false, ",")
            .authorization_url("state-1", None)
            .unwrap();
        let params = query(&url);

        assert_eq!(url.host_str(), Some("www.pinterest.com"));
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["state"], "state-1");
        assert_eq!(params["scope"], "boards:read,pins:read");
        assert_eq!(params["access_type"], "offline");
        assert!(!params.contains_key("code_challenge"));
    }

    #[test]
    fn authorization_url_carries_pkce_challenge() {
        let url = provider(true, " ")
            .authorization_url("s", Some("challenge"))
            .unwrap();
        let params = query(&url);

        assert_eq!(params["scope"], "boards:read pins:read");
        assert_eq!(params["code_challenge"], "challenge");
        assert_eq!(params["code_challenge_method"], "S256");
    }
}
