use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// A third-party platform the dashboard can connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Pinterest,
    #[serde(rename = "twitter", alias = "x")]
    X,
    Tumblr,
    #[serde(rename = "youtube")]
    YouTube,
    Bluesky,
}

impl Provider {
    /// Every supported provider, in dashboard order.
    pub const ALL: [Provider; 5] = [
        Provider::Tumblr,
        Provider::YouTube,
        Provider::Bluesky,
        Provider::X,
        Provider::Pinterest,
    ];

    /// The path segment used in `/auth/{provider}` and `/api/{provider}`.
    pub fn slug(self) -> &'static str {
        match self {
            Provider::Pinterest => "pinterest",
            Provider::X => "x",
            Provider::Tumblr => "tumblr",
            Provider::YouTube => "youtube",
            Provider::Bluesky => "bluesky",
        }
    }

    /// The name used for `NormalizedPost::platform` and filter keys.
    pub fn platform_name(self) -> &'static str {
        match self {
            Provider::X => "twitter",
            other => other.slug(),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Pinterest => "Pinterest",
            Provider::X => "X",
            Provider::Tumblr => "Tumblr",
            Provider::YouTube => "YouTube",
            Provider::Bluesky => "Bluesky",
        }
    }

    /// Tailwind badge class the dashboard paints posts with.
    pub fn color(self) -> &'static str {
        match self {
            Provider::Pinterest => "bg-red-700",
            Provider::X => "bg-gray-800",
            Provider::Tumblr => "bg-pink-500",
            Provider::YouTube => "bg-red-600",
            Provider::Bluesky => "bg-sky-500",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pinterest" => Ok(Provider::Pinterest),
            "x" | "twitter" => Ok(Provider::X),
            "tumblr" => Ok(Provider::Tumblr),
            "youtube" => Ok(Provider::YouTube),
            "bluesky" | "bsky" => Ok(Provider::Bluesky),
            _ => Err(AppError::NotFound),
        }
    }
}
