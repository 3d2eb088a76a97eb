use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use crate::error::{AppError, Result};
use crate::models::post::NormalizedPost;
use crate::models::provider::Provider;

/// Dashboard filter state. The default lets every post through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFilter {
    /// Platforms whose posts are shown.
    pub platforms: HashSet<Provider>,
    /// Inclusive lower bound, from 00:00:00 UTC.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound, through 23:59:59 UTC.
    pub date_to: Option<NaiveDate>,
    /// Exact author match.
    pub author: Option<String>,
}

impl Default for FeedFilter {
    fn default() -> Self {
        Self {
            platforms: Provider::ALL.into_iter().collect(),
            date_from: None,
            date_to: None,
            author: None,
        }
    }
}

fn parse_day(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{} must be a YYYY-MM-DD date", field))),
    }
}

impl FeedFilter {
    /// Builds a filter from raw query values; empty values mean "no filter".
    ///
    /// `platforms` is a comma-separated list of platform names (`x` and
    /// `twitter` are both accepted).
    pub fn from_query(
        platforms: Option<&str>,
        from: Option<&str>,
        to: Option<&str>,
        author: Option<&str>,
    ) -> Result<Self> {
        let platforms = match platforms.map(str::trim).filter(|s| !s.is_empty()) {
            None => Provider::ALL.into_iter().collect(),
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|name| {
                    name.parse::<Provider>().map_err(|_| {
                        AppError::Validation(format!("unknown platform: {}", name))
                    })
                })
                .collect::<Result<HashSet<_>>>()?,
        };

        Ok(Self {
            platforms,
            date_from: parse_day(from, "from")?,
            date_to: parse_day(to, "to")?,
            author: author
                .filter(|a| !a.is_empty())
                .map(str::to_string),
        })
    }

    /// Flips one platform on or off.
    pub fn toggle_platform(&mut self, platform: Provider) {
        if !self.platforms.remove(&platform) {
            self.platforms.insert(platform);
        }
    }

    pub fn matches_platform(&self, post: &NormalizedPost) -> bool {
        self.platforms.contains(&post.platform)
    }

    /// Undated posts always pass the date range.
    pub fn matches_date(&self, post: &NormalizedPost) -> bool {
        let Some(date) = post.date else {
            return true;
        };
        if let Some(from) = self.date_from.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            if date < from.and_utc() {
                return false;
            }
        }
        if let Some(to) = self.date_to.and_then(|d| d.and_hms_opt(23, 59, 59)) {
            if date > to.and_utc() {
                return false;
            }
        }
        true
    }

    pub fn matches_author(&self, post: &NormalizedPost) -> bool {
        self.author.as_deref().is_none_or(|a| post.author == a)
    }

    pub fn matches(&self, post: &NormalizedPost) -> bool {
        self.matches_platform(post) && self.matches_date(post) && self.matches_author(post)
    }

    /// Keeps matching posts and sorts them newest first, undated last.
    pub fn apply(&self, posts: Vec<NormalizedPost>) -> Vec<NormalizedPost> {
        let mut kept: Vec<NormalizedPost> = posts.into_iter().filter(|p| self.matches(p)).collect();
        sort_newest_first(&mut kept);
        kept
    }
}

fn compare_dates(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by date descending with undated posts at the end.
pub fn sort_newest_first(posts: &mut [NormalizedPost]) {
    posts.sort_by(|a, b| compare_dates(a.date, b.date));
}

/// Sorted, de-duplicated, non-empty authors for the author picker.
pub fn authors(posts: &[NormalizedPost]) -> Vec<String> {
    posts
        .iter()
        .map(|p| p.author.as_str())
        .filter(|a| !a.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap())
    }

    fn post(id: &str, platform: Provider, author: &str, date: Option<DateTime<Utc>>) -> NormalizedPost {
        NormalizedPost {
            id: id.to_string(),
            platform,
            text: format!("post {}", id),
            author: author.to_string(),
            date,
            thumbnail: None,
            platform_color: platform.color().to_string(),
        }
    }

    fn sample() -> Vec<NormalizedPost> {
        vec![
            post("a", Provider::Tumblr, "staff", at(2024, 1, 1, 9, 0, 0)),
            post("b", Provider::Bluesky, "alice", None),
            post("c", Provider::Bluesky, "alice", at(2024, 3, 1, 0, 0, 0)),
            post("d", Provider::X, "jack", at(2024, 1, 31, 23, 59, 59)),
            post("e", Provider::YouTube, "staff", at(2024, 2, 1, 0, 0, 0)),
            post("f", Provider::X, "jack", None),
        ]
    }

    fn ids(posts: &[NormalizedPost]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn sorts_newest_first_with_undated_last() {
        let posts = vec![
            post("jan", Provider::Tumblr, "a", at(2024, 1, 1, 0, 0, 0)),
            post("none", Provider::Tumblr, "a", None),
            post("mar", Provider::Tumblr, "a", at(2024, 3, 1, 0, 0, 0)),
        ];
        let sorted = FeedFilter::default().apply(posts);
        assert_eq!(ids(&sorted), vec!["mar", "jan", "none"]);
    }

    #[test]
    fn undated_posts_keep_their_order() {
        let sorted = FeedFilter::default().apply(sample());
        assert_eq!(ids(&sorted), vec!["c", "e", "d", "a", "b", "f"]);
    }

    #[test]
    fn date_range_is_inclusive_through_end_of_day() {
        let filter = FeedFilter::from_query(None, Some("2024-01-01"), Some("2024-01-31"), None).unwrap();
        let kept = filter.apply(sample());
        // Undated posts pass the date range.
        assert_eq!(ids(&kept), vec!["d", "a", "b", "f"]);
    }

    #[test]
    fn platform_and_author_filters() {
        let filter = FeedFilter::from_query(Some("bluesky, twitter"), None, None, Some("jack")).unwrap();
        assert_eq!(ids(&filter.apply(sample())), vec!["d", "f"]);

        let mut filter = FeedFilter::default();
        filter.toggle_platform(Provider::Bluesky);
        assert!(filter.apply(sample()).iter().all(|p| p.platform != Provider::Bluesky));
        filter.toggle_platform(Provider::Bluesky);
        assert_eq!(filter, FeedFilter::default());
    }

    #[test]
    fn predicates_commute_and_are_idempotent() {
        let filter = FeedFilter::from_query(Some("tumblr,x,youtube"), Some("2024-01-15"), None, Some("staff")).unwrap();
        let predicates: [fn(&FeedFilter, &NormalizedPost) -> bool; 3] = [
            FeedFilter::matches_platform,
            FeedFilter::matches_date,
            FeedFilter::matches_author,
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        let expected = filter.apply(sample());
        for order in orders {
            let mut posts = sample();
            for i in order {
                posts.retain(|p| predicates[i](&filter, p));
            }
            sort_newest_first(&mut posts);
            assert_eq!(posts, expected);
        }
        assert_eq!(filter.apply(expected.clone()), expected);
        assert_eq!(ids(&expected), vec!["e"]);
    }

    #[test]
    fn rejects_bad_query_values() {
        assert!(FeedFilter::from_query(Some("myspace"), None, None, None).is_err());
        assert!(FeedFilter::from_query(None, Some("01/02/2024"), None, None).is_err());
        let empty = FeedFilter::from_query(Some(""), Some(""), Some(" "), Some("")).unwrap();
        assert_eq!(empty, FeedFilter::default());
    }

    #[test]
    fn authors_are_unique_and_sorted() {
        assert_eq!(authors(&sample()), vec!["alice", "jack", "staff"]);
    }
}
