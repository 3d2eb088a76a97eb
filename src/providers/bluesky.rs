use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::provider::Provider;
use crate::models::session::BlueskyCredential;

/// The AT-protocol service (PDS) app-password logins are sent to.
#[derive(Debug, Clone)]
pub struct BlueskyProvider {
    pub service: String,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    did: String,
    handle: String,
    access_jwt: String,
    refresh_jwt: String,
}

impl BlueskyProvider {
    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service.trim_end_matches('/'), method)
    }

    /// Logs in with a handle (or email) and an app password.
    ///
    /// Bad credentials surface as a 401 rather than an upstream failure.
    pub async fn create_session(
        &self,
        http: &reqwest::Client,
        identifier: &str,
        password: &str,
    ) -> Result<BlueskyCredential> {
        let response = http
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&CreateSessionRequest {
                identifier,
                password,
            })
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::BAD_REQUEST {
            tracing::warn!("❌ Bluesky rejected login for {}", identifier);
            return Err(AppError::Authentication(
                "invalid Bluesky credentials".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                provider: Provider::Bluesky,
                status: status.as_u16(),
                body,
            });
        }

        let session: CreateSessionResponse = response.json().await?;
        tracing::info!("✅ Bluesky session created for {}", session.handle);

        Ok(BlueskyCredential {
            did: session.did,
            handle: session.handle,
            access_jwt: session.access_jwt,
            refresh_jwt: session.refresh_jwt,
            service: self.service.clone(),
        })
    }

    /// An authenticated XRPC query against the service the credential was issued by.
    pub fn query(
        http: &reqwest::Client,
        credential: &BlueskyCredential,
        method: &str,
        params: &[(&str, &str)],
    ) -> reqwest::RequestBuilder {
        let url = format!("{}/xrpc/{}", credential.service.trim_end_matches('/'), method);
        http.get(url)
            .bearer_auth(&credential.access_jwt)
            .query(params)
    }
}
