use futures::future::join_all;
use serde::Serialize;

use crate::error::AppError;
use crate::feed::filter::{FeedFilter, authors};
use crate::models::post::NormalizedPost;
use crate::models::provider::Provider;
use crate::services::proxy::ProviderApi;

/// A platform that could not be fetched; the rest of the feed is still served.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlatformError {
    pub platform: Provider,
    pub message: String,
}

/// The unified feed as returned by `GET /api/feed`.
#[derive(Debug, Serialize)]
pub struct AggregatedFeed {
    pub posts: Vec<NormalizedPost>,
    /// Authors across every fetched post, before the author filter.
    pub authors: Vec<String>,
    pub errors: Vec<PlatformError>,
}

fn failure_message(provider: Provider, error: &AppError) -> String {
    match error.upstream_status() {
        Some(429) => format!(
            "{} rate limit reached, try again later",
            provider.display_name()
        ),
        _ => format!("Failed to load {} posts", provider.display_name()),
    }
}

/// Fetches every connected platform the filter selects concurrently, then
/// filters and sorts the merged posts.
pub async fn aggregate(api: &ProviderApi<'_>, connected: &[Provider], filter: &FeedFilter) -> AggregatedFeed {
    let selected: Vec<Provider> = connected
        .iter()
        .copied()
        .filter(|p| filter.platforms.contains(p))
        .collect();

    let results = join_all(selected.iter().map(|&provider| async move {
        (provider, api.normalized_feed(provider).await)
    }))
    .await;

    let mut posts = Vec::new();
    let mut errors = Vec::new();
    for (provider, result) in results {
        match result {
            Ok(mut fetched) => {
                tracing::debug!("📥 {} posts from {}", fetched.len(), provider.display_name());
                posts.append(&mut fetched);
            }
            Err(e) => {
                tracing::warn!("❌ {} feed failed: {}", provider.display_name(), e);
                errors.push(PlatformError {
                    platform: provider,
                    message: failure_message(provider, &e),
                });
            }
        }
    }

    let authors = authors(&posts);
    AggregatedFeed {
        posts: filter.apply(posts),
        authors,
        errors,
    }
}
