use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::provider::Provider;

/// The common shape every provider's post is folded into before filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPost {
    /// `{platform}-{provider id}`, unique across platforms.
    pub id: String,
    pub platform: Provider,
    pub text: String,
    pub author: String,
    pub date: Option<DateTime<Utc>>,
    pub thumbnail: Option<String>,
    pub platform_color: String,
}
