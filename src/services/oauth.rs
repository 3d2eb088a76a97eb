use serde::Deserialize;

use crate::{
    crypto::csrf::{generate_state, states_match},
    crypto::pkce::PkcePair,
    error::{AppError, Result},
    models::pending::PendingAuth,
    models::provider::Provider,
    models::session::Session,
    state::AppState,
    validation::auth::BlueskyLogin,
};

/// Where the Bluesky start route sends the browser.
pub const BLUESKY_LOGIN_PATH: &str = "/auth/bluesky/login";

/// Query parameters a provider may append to its callback.
#[derive(Deserialize, Debug, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    /// OAuth 1.0a.
    pub oauth_token: Option<String>,
    pub oauth_verifier: Option<String>,
}

fn invalid_state() -> AppError {
    AppError::Validation("invalid or expired state".to_string())
}

/// Starts an authorization flow for `provider` and returns where to send the browser.
///
/// The session is mutated (`oauth_state`); the caller persists it.
pub async fn begin(state: &AppState, session: &mut Session, provider: Provider) -> Result<String> {
    match provider {
        Provider::Bluesky => Ok(BLUESKY_LOGIN_PATH.to_string()),

        Provider::Tumblr => {
            let app = state.config.providers.tumblr.as_ref().ok_or(AppError::NotFound)?;
            let request_token = app.request_token(&state.http).await?;

            let pending = PendingAuth::new(provider, session.id)
                .with_token_secret(request_token.secret.clone());
            state.pending.insert(&request_token.token, &pending).await?;
            session.oauth_state = Some(request_token.token.clone());

            tracing::info!("🔐 Tumblr authorization started for session {}", session.id);
            Ok(app.authorize_url(&request_token.token)?.to_string())
        }

        Provider::Pinterest | Provider::X | Provider::YouTube => {
            let app = state
                .config
                .providers
                .oauth2(provider)
                .ok_or(AppError::NotFound)?;

            let csrf_state = generate_state();
            let mut pending = PendingAuth::new(provider, session.id);
            let mut challenge = None;
            if app.pkce {
                let pair = PkcePair::generate();
                challenge = Some(pair.challenge);
                pending = pending.with_code_verifier(pair.verifier);
            }

            state.pending.insert(&csrf_state, &pending).await?;
            let url = app.authorization_url(&csrf_state, challenge.as_deref())?;
            session.oauth_state = Some(csrf_state);

            tracing::info!(
                "🔐 {} authorization started for session {}",
                provider.display_name(),
                session.id
            );
            Ok(url.to_string())
        }
    }
}

/// A callback parameter, with empty values treated as missing.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Takes the pending entry for `key` once it is known to belong to this session and provider.
///
/// An entry presented by any other session is left in place for its owner.
async fn take_pending(
    state: &AppState,
    session: &Session,
    provider: Provider,
    key: &str,
) -> Result<PendingAuth> {
    let pending = state.pending.get(key).await?.ok_or_else(|| {
        tracing::warn!("❌ {} callback with unknown state", provider.display_name());
        invalid_state()
    })?;

    let session_state = session.oauth_state.as_deref().unwrap_or_default();
    if pending.provider != provider
        || pending.session_id != session.id
        || !states_match(session_state, key)
    {
        tracing::warn!(
            "❌ {} callback state does not belong to session {}",
            provider.display_name(),
            session.id
        );
        return Err(invalid_state());
    }

    // A concurrent callback for the same state may have won the race.
    state.pending.take(key).await?.ok_or_else(invalid_state)
}

/// Finishes a flow from the provider's callback and stores the credential in `session`.
///
/// No token request is made unless the state checks pass.
pub async fn complete(
    state: &AppState,
    session: &mut Session,
    provider: Provider,
    params: &CallbackParams,
) -> Result<()> {
    if let Some(error) = &params.error {
        tracing::warn!(
            "❌ {} authorization denied: {} {}",
            provider.display_name(),
            error,
            params.error_description.as_deref().unwrap_or_default()
        );
        return Err(AppError::Validation(format!(
            "{} authorization failed: {}",
            provider.display_name(),
            error
        )));
    }

    match provider {
        Provider::Bluesky => Err(AppError::NotFound),

        Provider::Tumblr => {
            let app = state.config.providers.tumblr.as_ref().ok_or(AppError::NotFound)?;
            let (Some(token), Some(verifier)) =
                (present(&params.oauth_token), present(&params.oauth_verifier))
            else {
                return Err(AppError::Validation(
                    "missing oauth_token or oauth_verifier".to_string(),
                ));
            };

            let pending = take_pending(state, session, provider, token).await?;
            session.oauth_state = None;
            let secret = pending.token_secret.as_deref().unwrap_or_default();

            let credential = app.access_token(&state.http, token, secret, verifier).await?;
            session.credentials.tumblr = Some(credential);
            Ok(())
        }

        Provider::Pinterest | Provider::X | Provider::YouTube => {
            let app = state
                .config
                .providers
                .oauth2(provider)
                .ok_or(AppError::NotFound)?;
            let (Some(code), Some(csrf_state)) = (present(&params.code), present(&params.state))
            else {
                return Err(AppError::Validation("missing code or state".to_string()));
            };

            let pending = take_pending(state, session, provider, csrf_state).await?;
            session.oauth_state = None;

            let credential = app
                .exchange_code(&state.http, code, pending.code_verifier.as_deref())
                .await?;
            if !session.credentials.set_oauth2(provider, credential) {
                return Err(AppError::Internal(format!(
                    "{} has no OAuth 2.0 credential slot",
                    provider.display_name()
                )));
            }
            Ok(())
        }
    }
}

/// Logs into Bluesky with an app password and stores the AT-protocol session.
pub async fn connect_bluesky(state: &AppState, session: &mut Session, login: &BlueskyLogin) -> Result<()> {
    login.check()?;
    let credential = state
        .config
        .providers
        .bluesky
        .create_session(&state.http, login.identifier.trim(), &login.password)
        .await?;
    session.credentials.bluesky = Some(credential);
    Ok(())
}

/// Forgets the credential for `provider`.
pub fn disconnect(session: &mut Session, provider: Provider) {
    session.credentials.clear(provider);
    tracing::info!("🔌 {} disconnected for session {}", provider.display_name(), session.id);
}
