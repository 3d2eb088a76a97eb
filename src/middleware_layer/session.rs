use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::session::Session,
    state::AppState,
};

/// Name of the signed cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session_id";

/// Reads the session id from the signed cookie. Tampered values are ignored.
fn extract_session_id(state: &AppState, cookies: &Cookies) -> Option<Uuid> {
    cookies
        .signed(&state.cookie_key)
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

fn session_cookie(state: &AppState, value: String, max_age_secs: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);
    cookie.set_http_only(true);
    if state.config.secure_cookies {
        cookie.set_secure(true);
    }
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    cookie.set_path("/");
    cookie
}

fn fresh_session(state: &AppState) -> Session {
    let ttl = chrono::Duration::from_std(state.config.session_ttl)
        .unwrap_or_else(|_| chrono::Duration::hours(24));
    Session::new(ttl)
}

/// Attaches the caller's `Session` to the request.
///
/// A new, unsaved session is attached when the cookie is missing, invalid or
/// points at an expired record; it is only written once a handler persists it.
pub async fn load_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let session = match extract_session_id(&state, &cookies) {
        Some(id) => match state.sessions.load(&id).await? {
            Some(session) => {
                tracing::debug!("🔑 Found session: {}", id);
                session
            }
            None => {
                tracing::debug!("Session {} not found, starting a new one", id);
                fresh_session(&state)
            }
        },
        None => fresh_session(&state),
    };

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Rejects requests whose session has no logged-in local account.
pub async fn require_user(request: Request<Body>, next: Next) -> Result<Response> {
    let logged_in = request
        .extensions()
        .get::<Session>()
        .is_some_and(|s| s.user_id.is_some());

    if !logged_in {
        tracing::debug!("❌ No logged-in user on session");
        return Err(AppError::Authentication("not logged in".to_string()));
    }

    Ok(next.run(request).await)
}

/// Writes the session to the store and (re)issues its cookie.
pub async fn persist(state: &AppState, cookies: &Cookies, session: &Session) -> Result<()> {
    state.sessions.save(session).await?;

    let max_age = (session.expires_at - chrono::Utc::now()).num_seconds().max(0);
    cookies
        .signed(&state.cookie_key)
        .add(session_cookie(state, session.id.to_string(), max_age));
    tracing::debug!("✅ Session saved: {}", session.id);
    Ok(())
}

/// Moves the session to a fresh id, dropping the old record.
pub async fn rotate(state: &AppState, session: &mut Session) -> Result<()> {
    state.sessions.destroy(&session.id).await?;
    session.id = Uuid::new_v4();
    Ok(())
}

/// Deletes the session record and clears the cookie.
pub async fn destroy(state: &AppState, cookies: &Cookies, session: &Session) -> Result<()> {
    state.sessions.destroy(&session.id).await?;
    cookies.remove(session_cookie(state, String::new(), 0));
    tracing::info!("✅ Session destroyed: {}", session.id);
    Ok(())
}
