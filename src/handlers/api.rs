use axum::{
    extract::{Path, Query, State},
    response::Html,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{
    error::{AppError, Result},
    feed::filter::FeedFilter,
    models::provider::Provider,
    models::session::Session,
    services::feed::{self as feed_service, AggregatedFeed},
    services::proxy::ProviderApi,
    state::AppState,
};

/// `GET /api/feed` query string.
#[derive(Deserialize, Debug, Default)]
pub struct FeedQuery {
    pub platforms: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub author: Option<String>,
}

fn api<'a>(state: &'a AppState, session: &'a Session) -> ProviderApi<'a> {
    ProviderApi::new(&state.http, &state.config.providers, &session.credentials)
}

fn connected_provider(session: &Session, raw: &str) -> Result<Provider> {
    let provider: Provider = raw.parse()?;
    if !session.credentials.is_connected(provider) {
        return Err(AppError::NotConnected(provider));
    }
    Ok(provider)
}

pub async fn provider_me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(provider): Path<String>,
) -> Result<Json<Value>> {
    let provider = connected_provider(&session, &provider)?;
    Ok(Json(api(&state, &session).me(provider).await?))
}

pub async fn provider_posts(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(provider): Path<String>,
) -> Result<Json<Value>> {
    let provider = connected_provider(&session, &provider)?;
    Ok(Json(api(&state, &session).posts(provider).await?))
}

pub async fn provider_feed(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(provider): Path<String>,
) -> Result<Json<Value>> {
    let provider = connected_provider(&session, &provider)?;
    Ok(Json(api(&state, &session).feed(provider).await?))
}

/// `{provider: connected}` for every provider.
pub async fn connections(
    Extension(session): Extension<Session>,
) -> Json<BTreeMap<&'static str, bool>> {
    Json(
        Provider::ALL
            .into_iter()
            .map(|p| (p.slug(), session.credentials.is_connected(p)))
            .collect(),
    )
}

/// The unified, filtered feed across every connected platform.
#[axum::debug_handler]
pub async fn feed(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<AggregatedFeed>> {
    let filter = FeedFilter::from_query(
        query.platforms.as_deref(),
        query.from.as_deref(),
        query.to.as_deref(),
        query.author.as_deref(),
    )?;

    let connected = session.credentials.connected();
    if connected.is_empty() {
        return Err(AppError::Authentication(
            "no platform connected".to_string(),
        ));
    }

    let feed = feed_service::aggregate(&api(&state, &session), &connected, &filter).await;
    tracing::info!(
        "📰 Feed for session {}: {} posts, {} platform errors",
        session.id,
        feed.posts.len(),
        feed.errors.len()
    );
    Ok(Json(feed))
}

/// Plain status page with a connect link per configured provider.
pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Html<String> {
    let rows: String = Provider::ALL
        .into_iter()
        .filter(|p| state.config.providers.is_enabled(*p))
        .map(|p| {
            let status = if session.credentials.is_connected(p) {
                "connected"
            } else {
                "not connected"
            };
            format!(
                "    <li><a href=\"/auth/{}/start\">{}</a> ({})</li>\n",
                p.slug(),
                p.display_name(),
                status
            )
        })
        .collect();

    Html(format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>feedhub</title></head>\n<body>\n  <h1>feedhub is running</h1>\n  <ul>\n{}  </ul>\n</body>\n</html>\n",
        rows
    ))
}
