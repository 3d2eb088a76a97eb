use anyhow::Context;
use http::{HeaderValue, Method, header};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedhub::{config::Config, state::AppState};

/// How often expired store entries are purged.
const PURGE_INTERVAL: Duration = Duration::from_secs(600);

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = config
        .frontend_origin
        .parse()
        .context("FRONTEND_ORIGIN is not a valid header value")?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::COOKIE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    for provider in feedhub::models::provider::Provider::ALL {
        if config.providers.is_enabled(provider) {
            tracing::info!("✅ {} enabled", provider.display_name());
        } else {
            tracing::warn!("⚠️ {} not configured, its routes answer 404", provider.display_name());
        }
    }

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let app = feedhub::router(state.clone())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(cors_layer(&config)?);

    let purge_store = state.store.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(PURGE_INTERVAL).await;
            match purge_store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!("🧹 Purged {} expired store entries", purged),
                Err(e) => tracing::error!("❌ Store purge failed: {}", e),
            }
        }
    });

    tracing::info!("🚀 Server listening on http://{}", config.bind_addr);
    tracing::info!("✅ Background purge job started (runs every 10 minutes)");

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
