use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::{
    error::{AppError, Result},
    middleware_layer::session as session_layer,
    models::session::Session,
    models::user::UserProfile,
    services::auth as auth_service,
    state::AppState,
    validation::auth::Credentials,
};

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct UserResponse {
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Handles demo account registration and logs the new account in.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    cookies: Cookies,
    Json(payload): Json<Credentials>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt: {}", payload.email);

    let user = auth_service::register(&state.users, &payload).await?;

    session_layer::rotate(&state, &mut session).await?;
    session.user_id = Some(user.id);
    session_layer::persist(&state, &cookies, &session).await?;

    tracing::info!("✅ User registered: {}", user.id);

    let response = UserResponse {
        user: UserProfile::from(&user),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles demo account login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    cookies: Cookies,
    Json(payload): Json<Credentials>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt: {}", payload.email);

    let user = auth_service::authenticate(&state.users, &payload).await?;

    session_layer::rotate(&state, &mut session).await?;
    session.user_id = Some(user.id);
    session_layer::persist(&state, &cookies, &session).await?;

    tracing::info!("✅ User logged in: {}", user.id);

    let response = UserResponse {
        user: UserProfile::from(&user),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Destroys the session, provider credentials included.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    cookies: Cookies,
) -> Result<Response> {
    tracing::info!("👋 Logout for session: {}", session.id);

    session_layer::destroy(&state, &cookies, &session).await?;

    Ok((StatusCode::OK, Json(LogoutResponse { success: true })).into_response())
}

/// Returns the logged-in account.
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<UserResponse>> {
    let user_id = session
        .user_id
        .ok_or_else(|| AppError::Authentication("not logged in".to_string()))?;

    let user = state.users.find_by_id(&user_id).await?.ok_or_else(|| {
        tracing::warn!("❌ Session {} points at missing user {}", session.id, user_id);
        AppError::Authentication("not logged in".to_string())
    })?;

    Ok(Json(UserResponse {
        user: UserProfile::from(&user),
    }))
}
