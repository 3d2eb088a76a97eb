use reqwest::header::AUTHORIZATION;
use url::Url;
use zeroize::Zeroizing;

use crate::crypto::oauth1::OAuth1Signer;
use crate::error::{AppError, Result};
use crate::models::provider::Provider;
use crate::models::session::OAuth1Credential;

/// Tumblr's OAuth 1.0a application and endpoints.
#[derive(Clone)]
pub struct TumblrProvider {
    pub consumer_key: String,
    pub consumer_secret: Zeroizing<String>,
    pub callback_url: String,
    pub request_token_url: String,
    pub authorize_url: String,
    pub access_token_url: String,
    pub api_base: String,
}

/// A temporary request token issued at the start of the flow.
pub struct RequestToken {
    pub token: String,
    pub secret: String,
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| AppError::Internal(format!("Invalid Tumblr URL {}: {}", raw, e)))
}

/// Extracts `oauth_token` / `oauth_token_secret` from a form-encoded reply.
fn parse_token_pair(body: &str) -> Option<(String, String)> {
    let mut token = None;
    let mut secret = None;
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            _ => {}
        }
    }
    token.zip(secret)
}

impl TumblrProvider {
    fn signer(&self) -> OAuth1Signer<'_> {
        OAuth1Signer::consumer(&self.consumer_key, &self.consumer_secret)
    }

    async fn read_token_pair(&self, response: reqwest::Response) -> Result<(String, String)> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::error!("❌ Tumblr token request failed ({}): {}", status, body);
            return Err(AppError::Upstream {
                provider: Provider::Tumblr,
                status: status.as_u16(),
                body,
            });
        }
        parse_token_pair(&body).ok_or_else(|| AppError::Upstream {
            provider: Provider::Tumblr,
            status: status.as_u16(),
            body: "token response missing oauth_token".to_string(),
        })
    }

    /// Step 1: obtain a request token bound to our callback URL.
    pub async fn request_token(&self, http: &reqwest::Client) -> Result<RequestToken> {
        let url = parse_url(&self.request_token_url)?;
        let authorization = self.signer().authorization(
            "POST",
            &url,
            &[],
            &[("oauth_callback", self.callback_url.as_str())],
        );
        let response = http
            .post(url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;
        let (token, secret) = self.read_token_pair(response).await?;
        tracing::debug!("🔑 Tumblr request token issued");
        Ok(RequestToken { token, secret })
    }

    /// Step 2: where the browser goes to approve the request token.
    pub fn authorize_url(&self, request_token: &str) -> Result<Url> {
        let mut url = parse_url(&self.authorize_url)?;
        url.query_pairs_mut()
            .append_pair("oauth_token", request_token);
        Ok(url)
    }

    /// Step 3: trade the approved request token for an access token pair.
    pub async fn access_token(
        &self,
        http: &reqwest::Client,
        request_token: &str,
        request_secret: &str,
        verifier: &str,
    ) -> Result<OAuth1Credential> {
        let url = parse_url(&self.access_token_url)?;
        let authorization = self
            .signer()
            .with_token(request_token, request_secret)
            .authorization("POST", &url, &[], &[("oauth_verifier", verifier)]);
        let response = http
            .post(url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;
        let (token, token_secret) = self.read_token_pair(response).await?;
        tracing::info!("✅ Tumblr access token obtained");
        Ok(OAuth1Credential {
            token,
            token_secret,
        })
    }

    /// A signed GET against the v2 API, e.g. `path = "/user/info"`.
    pub fn signed_get(
        &self,
        http: &reqwest::Client,
        credential: &OAuth1Credential,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::RequestBuilder> {
        let mut url = parse_url(&format!("{}{}", self.api_base.trim_end_matches('/'), path))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let authorization = self
            .signer()
            .with_token(&credential.token, &credential.token_secret)
            .authorization("GET", &url, &[], &[]);
        Ok(http.get(url).header(AUTHORIZATION, authorization))
    }
}
