use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;

pub mod config;
pub mod error;
pub mod state;

pub mod crypto {
    pub mod csrf;
    pub mod oauth1;
    pub mod pkce;
}

pub mod feed {
    pub mod filter;
    pub mod normalize;
}

pub mod models {
    pub mod pending;
    pub mod post;
    pub mod provider;
    pub mod session;
    pub mod user;
}

pub mod providers {
    pub mod bluesky;
    pub mod oauth2;
    pub mod registry;
    pub mod tumblr;
}

pub mod store {
    pub mod kv;
    pub mod memory;
    pub mod redis;
}

pub mod repositories {
    pub mod pending;
    pub mod session;
    pub mod user;
}

pub mod services {
    pub mod auth;
    pub mod feed;
    pub mod oauth;
    pub mod proxy;
}

pub mod handlers {
    pub mod api;
    pub mod auth;
    pub mod oauth;
}

pub mod middleware_layer {
    pub mod session;
}

pub mod validation {
    pub mod auth;
}

use state::AppState;

/// Every route, with the session layer attached.
///
/// CORS and request tracing are added by the binary.
pub fn router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .route_layer(from_fn(middleware_layer::session::require_user));

    let auth_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route(
            "/auth/logout",
            get(handlers::auth::logout).post(handlers::auth::logout),
        )
        .route(
            "/auth/bluesky/login",
            get(handlers::oauth::bluesky_form).post(handlers::oauth::bluesky_login),
        )
        .route("/auth/{provider}/start", get(handlers::oauth::start))
        .route("/auth/{provider}/callback", get(handlers::oauth::callback))
        .route(
            "/auth/{provider}/disconnect",
            post(handlers::oauth::disconnect),
        );

    let api_routes = Router::new()
        .route("/api/connections", get(handlers::api::connections))
        .route("/api/feed", get(handlers::api::feed))
        .route("/api/{provider}/me", get(handlers::api::provider_me))
        .route("/api/{provider}/posts", get(handlers::api::provider_posts))
        .route("/api/{provider}/feed", get(handlers::api::provider_feed));

    Router::new()
        .route("/", get(handlers::api::index))
        .merge(user_routes)
        .merge(auth_routes)
        .merge(api_routes)
        .layer(from_fn_with_state(
            state.clone(),
            middleware_layer::session::load_session,
        ))
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
