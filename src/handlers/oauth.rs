use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::header::CONTENT_TYPE,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::{
    error::{AppError, Result},
    middleware_layer::session as session_layer,
    models::provider::Provider,
    models::session::Session,
    services::oauth::{self as oauth_service, CallbackParams},
    state::AppState,
    validation::auth::BlueskyLogin,
};

const BLUESKY_LOGIN_FORM: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Connect Bluesky</title></head>
<body>
  <h1>Connect Bluesky</h1>
  <p>Use an app password (Settings &rarr; App Passwords), not your account password.</p>
  <form method="post" action="/auth/bluesky/login">
    <label>Handle or email <input name="identifier" autocomplete="username" required></label>
    <label>App password <input name="password" type="password" autocomplete="current-password" required></label>
    <button type="submit">Connect</button>
  </form>
</body>
</html>
"#;

#[derive(Serialize)]
pub struct ConnectedResponse {
    pub connected: Provider,
    pub handle: String,
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub disconnected: Provider,
}

/// Redirects the browser to `provider`'s authorization page.
#[axum::debug_handler]
pub async fn start(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    cookies: Cookies,
    Path(provider): Path<String>,
) -> Result<Redirect> {
    let provider: Provider = provider.parse()?;
    if !state.config.providers.is_enabled(provider) {
        tracing::debug!("{} is not configured", provider.display_name());
        return Err(AppError::NotFound);
    }

    let location = oauth_service::begin(&state, &mut session, provider).await?;
    if provider != Provider::Bluesky {
        session_layer::persist(&state, &cookies, &session).await?;
    }

    Ok(Redirect::to(&location))
}

/// Provider callback: validates state, exchanges the code and stores the credential.
#[axum::debug_handler]
pub async fn callback(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    cookies: Cookies,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let provider: Provider = provider.parse()?;

    let had_state = session.oauth_state.is_some();
    let outcome = oauth_service::complete(&state, &mut session, provider, &params).await;
    // The pending entry is consumed even when the exchange fails.
    if had_state && session.oauth_state.is_none() {
        session_layer::persist(&state, &cookies, &session).await?;
    }
    outcome?;

    tracing::info!(
        "✅ {} connected for session {}",
        provider.display_name(),
        session.id
    );
    Ok(Redirect::to(&state.config.post_login_redirect))
}

/// Clears one provider's credential from the session.
#[axum::debug_handler]
pub async fn disconnect(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    cookies: Cookies,
    Path(provider): Path<String>,
) -> Result<Json<DisconnectResponse>> {
    let provider: Provider = provider.parse()?;

    oauth_service::disconnect(&mut session, provider);
    session_layer::persist(&state, &cookies, &session).await?;

    Ok(Json(DisconnectResponse {
        disconnected: provider,
    }))
}

/// The Bluesky app-password form.
pub async fn bluesky_form() -> Html<&'static str> {
    Html(BLUESKY_LOGIN_FORM)
}

/// Accepts the Bluesky form as urlencoded or JSON.
///
/// Form posts are redirected to the dashboard; JSON callers get the handle back.
pub async fn bluesky_login(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    cookies: Cookies,
    request: Request,
) -> Result<Response> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let login = if is_json {
        let Json(login) = Json::<BlueskyLogin>::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        login
    } else {
        let Form(login) = Form::<BlueskyLogin>::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        login
    };

    oauth_service::connect_bluesky(&state, &mut session, &login).await?;
    session_layer::persist(&state, &cookies, &session).await?;

    let handle = session
        .credentials
        .bluesky
        .as_ref()
        .map(|c| c.handle.clone())
        .unwrap_or_default();
    tracing::info!("✅ Bluesky connected as {} for session {}", handle, session.id);

    if is_json {
        Ok(Json(ConnectedResponse {
            connected: Provider::Bluesky,
            handle,
        })
        .into_response())
    } else {
        Ok(Redirect::to(&state.config.post_login_redirect).into_response())
    }
}
