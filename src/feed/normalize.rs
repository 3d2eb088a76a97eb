//! Folding each provider's post shape into [`NormalizedPost`].
//!
//! Every function here is total: any JSON value produces a post, with the
//! documented fallbacks standing in for missing or empty fields.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::post::NormalizedPost;
use crate::models::provider::Provider;

/// First non-empty string among `candidates`.
fn first_text<'a>(candidates: impl IntoIterator<Item = Option<&'a Value>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Renders an id that may arrive as a string or a number.
fn id_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "unknown".to_string(),
    }
}

/// Parses provider timestamps: RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (taken as
/// UTC), plain dates, and unix seconds.
pub fn parse_date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|n| n.and_utc())
                })
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|n| n.and_utc())
                })
        }
        _ => None,
    }
}

fn post(
    provider: Provider,
    id: String,
    text: String,
    author: String,
    date: Option<DateTime<Utc>>,
    thumbnail: Option<String>,
) -> NormalizedPost {
    NormalizedPost {
        id: format!("{}-{}", provider.platform_name(), id),
        platform: provider,
        text,
        author,
        date,
        thumbnail,
        platform_color: provider.color().to_string(),
    }
}

/// A Tumblr dashboard or blog post.
pub fn tumblr(item: &Value) -> NormalizedPost {
    post(
        Provider::Tumblr,
        id_string(item.get("id_string").or_else(|| item.get("id"))),
        first_text([item.get("summary"), item.get("slug")])
            .unwrap_or_else(|| "(Feed item)".to_string()),
        first_text([item.get("blog_name"), item.pointer("/blog/name")])
            .unwrap_or_else(|| "Tumblr User".to_string()),
        parse_date(item.get("timestamp")),
        None,
    )
}

/// A video from the reshaped YouTube feed (`{id, title, publishedAt, thumbnail}`).
pub fn youtube(video: &Value, channel_name: Option<&str>) -> NormalizedPost {
    post(
        Provider::YouTube,
        id_string(video.get("id")),
        first_text([video.get("title")]).unwrap_or_else(|| "(Untitled video)".to_string()),
        channel_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| "YouTube".to_string(), str::to_string),
        parse_date(video.get("publishedAt")),
        first_text([video.get("thumbnail")]),
    )
}

/// A Bluesky feed item (`{post: {uri, author, record}}`).
pub fn bluesky(item: &Value) -> NormalizedPost {
    let post_value = item.get("post").unwrap_or(item);
    post(
        Provider::Bluesky,
        id_string(post_value.get("uri")),
        first_text([post_value.pointer("/record/text")])
            .unwrap_or_else(|| "(No text)".to_string()),
        first_text([
            post_value.pointer("/author/displayName"),
            post_value.pointer("/author/handle"),
        ])
        .unwrap_or_else(|| "Bluesky User".to_string()),
        parse_date(post_value.pointer("/record/createdAt")),
        first_text([post_value.pointer("/embed/images/0/thumb")]),
    )
}

/// A tweet; `user` is the `/users/me` payload of the account that owns it.
pub fn twitter(tweet: &Value, user: Option<&Value>) -> NormalizedPost {
    post(
        Provider::X,
        id_string(tweet.get("id")),
        first_text([tweet.get("text")]).unwrap_or_else(|| "(No text)".to_string()),
        first_text([
            user.and_then(|u| u.get("username")),
            user.and_then(|u| u.get("name")),
        ])
        .unwrap_or_else(|| "X User".to_string()),
        parse_date(tweet.get("created_at")),
        None,
    )
}

/// A Pinterest pin.
pub fn pinterest(pin: &Value, username: Option<&str>) -> NormalizedPost {
    post(
        Provider::Pinterest,
        id_string(pin.get("id")),
        first_text([pin.get("title"), pin.get("description")])
            .unwrap_or_else(|| "(Pin)".to_string()),
        username
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| "Pinterest User".to_string(), str::to_string),
        parse_date(pin.get("created_at")),
        first_text([
            pin.pointer("/media/images/600x/url"),
            pin.pointer("/media/images/400x300/url"),
            pin.pointer("/media/images/150x150/url"),
        ]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn tumblr_uses_summary_then_slug() {
        let p = tumblr(&json!({
            "id": 7123, "summary": "", "slug": "my-slug",
            "blog_name": "staff", "timestamp": 1_704_067_200
        }));
        assert_eq!(p.id, "tumblr-7123");
        assert_eq!(p.text, "my-slug");
        assert_eq!(p.author, "staff");
        assert_eq!(p.date, Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(p.platform_color, "bg-pink-500");
    }

    #[test]
    fn bluesky_prefers_display_name() {
        let item = json!({"post": {
            "uri": "at://did:plc:abc/app.bsky.feed.post/1",
            "author": {"handle": "alice.bsky.social", "displayName": ""},
            "record": {"text": "hello", "createdAt": "2024-03-01T12:00:00.000Z"}
        }});
        let p = bluesky(&item);
        assert_eq!(p.id, "bluesky-at://did:plc:abc/app.bsky.feed.post/1");
        assert_eq!(p.author, "alice.bsky.social");
        assert_eq!(p.text, "hello");
        assert!(p.date.is_some());
    }

    #[test]
    fn twitter_author_comes_from_user() {
        let user = json!({"id": "1", "name": "Jack", "username": "jack"});
        let p = twitter(
            &json!({"id": "20", "text": "just setting up", "created_at": "2024-01-01T00:00:00.000Z"}),
            Some(&user),
        );
        assert_eq!(p.id, "twitter-20");
        assert_eq!(p.author, "jack");
        assert_eq!(p.platform, Provider::X);
    }

    #[test]
    fn youtube_carries_thumbnail() {
        let p = youtube(
            &json!({"id": "abc", "title": "Demo", "publishedAt": "2024-02-02T10:00:00Z", "thumbnail": "https://i.ytimg.com/x.jpg"}),
            Some("My Channel"),
        );
        assert_eq!(p.author, "My Channel");
        assert_eq!(p.thumbnail.as_deref(), Some("https://i.ytimg.com/x.jpg"));
    }

    #[test]
    fn pinterest_accepts_naive_timestamps() {
        let p = pinterest(
            &json!({"id": "99", "description": "recipe", "created_at": "2020-01-01T20:10:40"}),
            None,
        );
        assert_eq!(p.text, "recipe");
        assert_eq!(p.author, "Pinterest User");
        assert_eq!(p.date, Some(Utc.with_ymd_and_hms(2020, 1, 1, 20, 10, 40).unwrap()));
    }

    #[test]
    fn normalization_is_total() {
        for junk in [json!(null), json!({}), json!([1, 2]), json!("str"), json!({"post": 5})] {
            for p in [
                tumblr(&junk),
                youtube(&junk, None),
                bluesky(&junk),
                twitter(&junk, None),
                pinterest(&junk, None),
            ] {
                assert!(!p.text.is_empty());
                assert!(!p.author.is_empty());
                assert!(p.date.is_none());
                assert!(p.id.ends_with("-unknown"));
            }
        }
    }

    #[test]
    fn unparseable_dates_are_none() {
        assert_eq!(parse_date(Some(&json!("yesterday"))), None);
        assert_eq!(parse_date(Some(&json!(true))), None);
        assert_eq!(parse_date(None), None);
        assert!(parse_date(Some(&json!("2024-05-05"))).is_some());
    }
}
