use reqwest::RequestBuilder;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::feed::normalize;
use crate::models::post::NormalizedPost;
use crate::models::provider::Provider;
use crate::models::session::{BlueskyCredential, OAuth1Credential, OAuth2Credential, ProviderCredentials};
use crate::providers::bluesky::BlueskyProvider;
use crate::providers::registry::ProviderRegistry;
use crate::providers::tumblr::TumblrProvider;

const PINTEREST_PAGE_SIZE: &str = "25";
const X_MAX_RESULTS: &str = "10";
const TUMBLR_LIMIT: &str = "20";
const YOUTUBE_MAX_RESULTS: &str = "20";
const BLUESKY_LIMIT: &str = "30";

/// Sends `request` and returns the JSON body, turning non-2xx replies into
/// `AppError::Upstream` with the provider's body logged.
async fn send_json(provider: Provider, request: RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            "❌ {} API error ({}): {}",
            provider.display_name(),
            status,
            body
        );
        return Err(AppError::Upstream {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.json::<Value>().await?)
}

/// Read-only calls against connected providers, on behalf of one session.
pub struct ProviderApi<'a> {
    http: &'a reqwest::Client,
    providers: &'a ProviderRegistry,
    credentials: &'a ProviderCredentials,
}

impl<'a> ProviderApi<'a> {
    pub fn new(
        http: &'a reqwest::Client,
        providers: &'a ProviderRegistry,
        credentials: &'a ProviderCredentials,
    ) -> Self {
        Self {
            http,
            providers,
            credentials,
        }
    }

    fn oauth2(&self, provider: Provider) -> Result<&'a OAuth2Credential> {
        self.credentials
            .oauth2(provider)
            .ok_or(AppError::NotConnected(provider))
    }

    fn tumblr(&self) -> Result<(&'a TumblrProvider, &'a OAuth1Credential)> {
        let credential = self
            .credentials
            .tumblr
            .as_ref()
            .ok_or(AppError::NotConnected(Provider::Tumblr))?;
        let app = self.providers.tumblr.as_ref().ok_or(AppError::NotFound)?;
        Ok((app, credential))
    }

    fn bluesky(&self) -> Result<&'a BlueskyCredential> {
        self.credentials
            .bluesky
            .as_ref()
            .ok_or(AppError::NotConnected(Provider::Bluesky))
    }

    fn bearer_get(&self, provider: Provider, path: &str) -> Result<RequestBuilder> {
        let credential = self.oauth2(provider)?;
        let url = format!(
            "{}{}",
            self.providers.api_base(provider).trim_end_matches('/'),
            path
        );
        Ok(self.http.get(url).bearer_auth(&credential.access_token))
    }

    /// The connected account's profile.
    pub async fn me(&self, provider: Provider) -> Result<Value> {
        match provider {
            Provider::Pinterest => {
                send_json(provider, self.bearer_get(provider, "/user_account")?).await
            }
            Provider::X => send_json(provider, self.bearer_get(provider, "/users/me")?).await,
            Provider::Tumblr => {
                let (app, credential) = self.tumblr()?;
                send_json(
                    provider,
                    app.signed_get(self.http, credential, "/user/info", &[])?,
                )
                .await
            }
            Provider::YouTube => {
                let channel = self.youtube_channel().await?;
                Ok(json!({ "user": channel.map(|c| youtube_user(&c)) }))
            }
            Provider::Bluesky => {
                let credential = self.bluesky()?;
                send_json(
                    provider,
                    BlueskyProvider::query(
                        self.http,
                        credential,
                        "app.bsky.actor.getProfile",
                        &[("actor", credential.did.as_str())],
                    ),
                )
                .await
            }
        }
    }

    /// The account's own recent posts.
    pub async fn posts(&self, provider: Provider) -> Result<Value> {
        match provider {
            Provider::Pinterest => {
                send_json(
                    provider,
                    self.bearer_get(provider, "/pins")?
                        .query(&[("page_size", PINTEREST_PAGE_SIZE)]),
                )
                .await
            }
            Provider::X => {
                let user = self.x_user().await?;
                self.x_tweets(&user).await
            }
            Provider::Tumblr => self.tumblr_blog_posts().await,
            Provider::YouTube => self.youtube_feed().await,
            Provider::Bluesky => {
                let credential = self.bluesky()?;
                let body = send_json(
                    provider,
                    BlueskyProvider::query(
                        self.http,
                        credential,
                        "app.bsky.feed.getAuthorFeed",
                        &[("actor", credential.did.as_str()), ("limit", BLUESKY_LIMIT)],
                    ),
                )
                .await?;
                Ok(body.get("feed").cloned().unwrap_or_else(|| json!([])))
            }
        }
    }

    /// What the dashboard shows for this provider: the Tumblr dashboard and the
    /// Bluesky timeline, otherwise the account's own posts.
    pub async fn feed(&self, provider: Provider) -> Result<Value> {
        match provider {
            Provider::Tumblr => {
                let (app, credential) = self.tumblr()?;
                let body = send_json(
                    provider,
                    app.signed_get(
                        self.http,
                        credential,
                        "/user/dashboard",
                        &[("limit", TUMBLR_LIMIT)],
                    )?,
                )
                .await?;
                Ok(json!({ "posts": body.pointer("/response/posts").cloned().unwrap_or_else(|| json!([])) }))
            }
            Provider::Bluesky => {
                let credential = self.bluesky()?;
                let body = send_json(
                    provider,
                    BlueskyProvider::query(
                        self.http,
                        credential,
                        "app.bsky.feed.getTimeline",
                        &[("limit", BLUESKY_LIMIT)],
                    ),
                )
                .await?;
                Ok(body.get("feed").cloned().unwrap_or_else(|| json!([])))
            }
            other => self.posts(other).await,
        }
    }

    /// The provider's feed folded into `NormalizedPost`s.
    pub async fn normalized_feed(&self, provider: Provider) -> Result<Vec<NormalizedPost>> {
        let posts: Vec<NormalizedPost> = match provider {
            Provider::Pinterest => {
                let user = self.me(provider).await?;
                let username = user.get("username").and_then(Value::as_str);
                let pins = self.posts(provider).await?;
                items(&pins, "/items")
                    .iter()
                    .map(|pin| normalize::pinterest(pin, username))
                    .collect()
            }
            Provider::X => {
                let user = self.x_user().await?;
                let tweets = self.x_tweets(&user).await?;
                items(&tweets, "/data")
                    .iter()
                    .map(|tweet| normalize::twitter(tweet, Some(&user)))
                    .collect()
            }
            Provider::Tumblr => {
                let feed = self.feed(provider).await?;
                items(&feed, "/posts").iter().map(normalize::tumblr).collect()
            }
            Provider::YouTube => {
                let channel = self.youtube_channel().await?;
                let name = channel
                    .as_ref()
                    .and_then(|c| c.pointer("/snippet/title"))
                    .and_then(Value::as_str);
                let feed = match &channel {
                    Some(channel) => self.youtube_uploads(channel).await?,
                    None => Vec::new(),
                };
                feed.iter().map(|v| normalize::youtube(v, name)).collect()
            }
            Provider::Bluesky => {
                let feed = self.feed(provider).await?;
                items(&feed, "").iter().map(normalize::bluesky).collect()
            }
        };
        Ok(posts)
    }

    async fn x_user(&self) -> Result<Value> {
        let body = send_json(Provider::X, self.bearer_get(Provider::X, "/users/me")?).await?;
        body.get("data").cloned().ok_or_else(|| AppError::Upstream {
            provider: Provider::X,
            status: 200,
            body: body.to_string(),
        })
    }

    async fn x_tweets(&self, user: &Value) -> Result<Value> {
        let id = user
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Upstream {
                provider: Provider::X,
                status: 200,
                body: "user lookup returned no id".to_string(),
            })?;
        send_json(
            Provider::X,
            self.bearer_get(Provider::X, &format!("/users/{}/tweets", id))?
                .query(&[("max_results", X_MAX_RESULTS), ("tweet.fields", "created_at")]),
        )
        .await
    }

    /// `{blog, posts}` for the user's primary blog.
    async fn tumblr_blog_posts(&self) -> Result<Value> {
        let (app, credential) = self.tumblr()?;
        let info = send_json(
            Provider::Tumblr,
            app.signed_get(self.http, credential, "/user/info", &[])?,
        )
        .await?;

        let blogs = items(&info, "/response/user/blogs");
        let Some(blog) = blogs
            .iter()
            .find(|b| b.get("primary").and_then(Value::as_bool) == Some(true))
            .or_else(|| blogs.first())
            .cloned()
        else {
            return Ok(json!({ "blog": null, "posts": [] }));
        };

        let name = blog.get("name").and_then(Value::as_str).unwrap_or_default();
        let posts = send_json(
            Provider::Tumblr,
            app.signed_get(
                self.http,
                credential,
                &format!("/blog/{}/posts", name),
                &[("limit", TUMBLR_LIMIT)],
            )?,
        )
        .await?;

        Ok(json!({
            "blog": blog,
            "posts": posts.pointer("/response/posts").cloned().unwrap_or_else(|| json!([])),
        }))
    }

    async fn youtube_channel(&self) -> Result<Option<Value>> {
        let body = send_json(
            Provider::YouTube,
            self.bearer_get(Provider::YouTube, "/channels")?
                .query(&[("part", "snippet,contentDetails"), ("mine", "true")]),
        )
        .await?;
        Ok(items(&body, "/items").first().cloned())
    }

    async fn youtube_uploads(&self, channel: &Value) -> Result<Vec<Value>> {
        let Some(playlist) = channel
            .pointer("/contentDetails/relatedPlaylists/uploads")
            .and_then(Value::as_str)
        else {
            return Ok(Vec::new());
        };

        let body = send_json(
            Provider::YouTube,
            self.bearer_get(Provider::YouTube, "/playlistItems")?.query(&[
                ("part", "snippet"),
                ("playlistId", playlist),
                ("maxResults", YOUTUBE_MAX_RESULTS),
            ]),
        )
        .await?;

        Ok(items(&body, "/items").iter().map(youtube_video).collect())
    }

    async fn youtube_feed(&self) -> Result<Value> {
        let feed = match self.youtube_channel().await? {
            Some(channel) => self.youtube_uploads(&channel).await?,
            None => Vec::new(),
        };
        Ok(json!({ "feed": feed }))
    }
}

/// The array at `pointer` (`""` for the root), or an empty slice.
fn items<'v>(value: &'v Value, pointer: &str) -> &'v [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn youtube_user(channel: &Value) -> Value {
    json!({
        "id": channel.get("id"),
        "name": channel.pointer("/snippet/title"),
        "thumbnail": channel.pointer("/snippet/thumbnails/default/url"),
    })
}

/// Reshapes a `playlistItems` entry to `{id, title, publishedAt, thumbnail}`.
fn youtube_video(item: &Value) -> Value {
    let snippet = item.get("snippet");
    let thumbnail = snippet
        .and_then(|s| {
            s.pointer("/thumbnails/medium/url")
                .or_else(|| s.pointer("/thumbnails/default/url"))
        })
        .cloned();
    json!({
        "id": snippet
            .and_then(|s| s.pointer("/resourceId/videoId"))
            .or_else(|| item.get("id")),
        "title": snippet.and_then(|s| s.get("title")),
        "publishedAt": snippet.and_then(|s| s.get("publishedAt")),
        "thumbnail": thumbnail,
    })
}
