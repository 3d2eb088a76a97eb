#![allow(dead_code)]

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use feedhub::{config::Config, state::AppState, store::memory::MemoryStore};

pub const SESSION_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const DASHBOARD: &str = "http://dashboard.test/dashboard";
pub const BLUESKY_APP_PASSWORD: &str = "abcd-efgh-ijkl-mnop";

/// Counters and switches shared with the mock provider.
#[derive(Default)]
pub struct MockProvider {
    pub token_requests: AtomicUsize,
    pub token_forms: Mutex<Vec<HashMap<String, String>>>,
    pub x_rate_limited: AtomicBool,
    pub token_rejected: AtomicBool,
    pub tumblr_access_requests: AtomicUsize,
}

impl MockProvider {
    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn tumblr_access_requests(&self) -> usize {
        self.tumblr_access_requests.load(Ordering::SeqCst)
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn token(
    State(mock): State<Arc<MockProvider>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let n = mock.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    let ok = form.get("grant_type").map(String::as_str) == Some("authorization_code")
        && form.get("code").is_some_and(|c| !c.is_empty());
    mock.token_forms.lock().unwrap().push(form);

    if mock.token_rejected.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Authorization code expired"})),
        );
    }
    if !ok {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "access_token": format!("access-{}", n),
            "token_type": "bearer",
            "expires_in": 3600,
            "scope": "read",
        })),
    )
}

async fn authorized(headers: HeaderMap, body: Value) -> (StatusCode, Json<Value>) {
    match bearer(&headers) {
        Some(_) => (StatusCode::OK, Json(body)),
        None => (StatusCode::UNAUTHORIZED, Json(json!({"message": "missing token"}))),
    }
}

async fn pinterest_user(headers: HeaderMap) -> impl IntoResponse {
    authorized(headers, json!({"username": "pinner", "account_type": "PINNER"})).await
}

async fn pinterest_pins(headers: HeaderMap) -> impl IntoResponse {
    authorized(
        headers,
        json!({"items": [{
            "id": "p1",
            "title": "Pin one",
            "created_at": "2024-01-01T10:00:00Z",
            "media": {"images": {"600x": {"url": "https://i.pinimg.test/p1.jpg"}}}
        }]}),
    )
    .await
}

async fn x_me(headers: HeaderMap) -> impl IntoResponse {
    authorized(headers, json!({"data": {"id": "42", "name": "Jack", "username": "jack"}})).await
}

async fn x_tweets(
    State(mock): State<Arc<MockProvider>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if mock.x_rate_limited.load(Ordering::SeqCst) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"title": "Too Many Requests", "status": 429})),
        );
    }
    authorized(
        headers,
        json!({"data": [{"id": format!("{}-t1", id), "text": "hello from x", "created_at": "2024-02-01T00:00:00.000Z"}]}),
    )
    .await
}

async fn bluesky_create_session(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] != BLUESKY_APP_PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "AuthenticationRequired", "message": "Invalid identifier or password"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "did": "did:plc:alice",
            "handle": body["identifier"],
            "accessJwt": "bsky-access",
            "refreshJwt": "bsky-refresh",
        })),
    )
}

async fn bluesky_timeline(headers: HeaderMap) -> impl IntoResponse {
    authorized(
        headers,
        json!({"feed": [
            {"post": {
                "uri": "at://did:plc:alice/app.bsky.feed.post/1",
                "author": {"handle": "alice.bsky.social", "displayName": "Alice"},
                "record": {"text": "hello from bluesky", "createdAt": "2024-03-01T12:00:00Z"}
            }},
            {"post": {
                "uri": "at://did:plc:bob/app.bsky.feed.post/2",
                "author": {"handle": "bob.bsky.social"},
                "record": {"text": ""}
            }}
        ]}),
    )
    .await
}

/// Whether the request carries a signed OAuth 1.0a `Authorization` header containing `needle`.
fn oauth1_header_with(headers: &HeaderMap, needle: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            v.starts_with("OAuth ")
                && v.contains("oauth_signature_method=\"HMAC-SHA1\"")
                && v.contains("oauth_signature=")
                && v.contains(needle)
        })
}

fn form_reply(status: StatusCode, body: &'static str) -> (StatusCode, [(&'static str, &'static str); 1], &'static str) {
    (status, [("content-type", "application/x-www-form-urlencoded")], body)
}

async fn tumblr_request_token(headers: HeaderMap) -> impl IntoResponse {
    if !oauth1_header_with(&headers, "oauth_callback=") {
        return form_reply(StatusCode::UNAUTHORIZED, "oauth_problem=signature_invalid");
    }
    form_reply(
        StatusCode::OK,
        "oauth_token=req-token&oauth_token_secret=req-secret&oauth_callback_confirmed=true",
    )
}

async fn tumblr_access_token(
    State(mock): State<Arc<MockProvider>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    mock.tumblr_access_requests.fetch_add(1, Ordering::SeqCst);
    if !oauth1_header_with(&headers, "oauth_token=\"req-token\"")
        || !oauth1_header_with(&headers, "oauth_verifier=\"tumblr-verifier\"")
    {
        return form_reply(StatusCode::UNAUTHORIZED, "oauth_problem=token_rejected");
    }
    form_reply(StatusCode::OK, "oauth_token=acc-token&oauth_token_secret=acc-secret")
}

async fn tumblr_signed(headers: HeaderMap, body: Value) -> (StatusCode, Json<Value>) {
    if !oauth1_header_with(&headers, "oauth_token=\"acc-token\"") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"meta": {"status": 401}})));
    }
    (StatusCode::OK, Json(body))
}

async fn tumblr_user_info(headers: HeaderMap) -> impl IntoResponse {
    tumblr_signed(
        headers,
        json!({"response": {"user": {"name": "staff", "blogs": [
            {"name": "sideblog", "primary": false},
            {"name": "staffblog", "primary": true}
        ]}}}),
    )
    .await
}

async fn tumblr_blog_posts(Path(name): Path<String>, headers: HeaderMap) -> impl IntoResponse {
    tumblr_signed(
        headers,
        json!({"response": {"posts": [{"id": 1, "summary": format!("blog post on {}", name), "blog_name": name}]}}),
    )
    .await
}

async fn tumblr_dashboard(headers: HeaderMap) -> impl IntoResponse {
    tumblr_signed(
        headers,
        json!({"response": {"posts": [{
            "id": 7,
            "id_string": "7",
            "summary": "dashboard post",
            "blog_name": "staffblog",
            "timestamp": 1706745600
        }]}}),
    )
    .await
}

async fn youtube_channels(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if query.get("mine").map(String::as_str) != Some("true") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": {"code": 400}})));
    }
    authorized(
        headers,
        json!({"items": [{
            "id": "UC1",
            "snippet": {
                "title": "My Channel",
                "thumbnails": {"default": {"url": "https://yt.test/channel.jpg"}}
            },
            "contentDetails": {"relatedPlaylists": {"uploads": "UU1"}}
        }]}),
    )
    .await
}

async fn youtube_playlist_items(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if query.get("playlistId").map(String::as_str) != Some("UU1") {
        return (StatusCode::NOT_FOUND, Json(json!({"error": {"code": 404}})));
    }
    authorized(
        headers,
        json!({"items": [{
            "id": "item-1",
            "snippet": {
                "title": "Launch",
                "publishedAt": "2024-01-20T10:00:00Z",
                "resourceId": {"videoId": "vid1"},
                "thumbnails": {"medium": {"url": "https://yt.test/vid1.jpg"}}
            }
        }]}),
    )
    .await
}

/// Starts the mock provider on an ephemeral port.
pub async fn spawn_mock(mock: Arc<MockProvider>) -> SocketAddr {
    let app = Router::new()
        .route("/oauth/token", post(token))
        .route("/pinterest/user_account", get(pinterest_user))
        .route("/pinterest/pins", get(pinterest_pins))
        .route("/x/users/me", get(x_me))
        .route("/x/users/{id}/tweets", get(x_tweets))
        .route(
            "/xrpc/com.atproto.server.createSession",
            post(bluesky_create_session),
        )
        .route("/xrpc/app.bsky.feed.getTimeline", get(bluesky_timeline))
        .route("/tumblr/oauth/request_token", post(tumblr_request_token))
        .route("/tumblr/oauth/access_token", post(tumblr_access_token))
        .route("/tumblr/v2/user/info", get(tumblr_user_info))
        .route("/tumblr/v2/blog/{name}/posts", get(tumblr_blog_posts))
        .route("/tumblr/v2/user/dashboard", get(tumblr_dashboard))
        .route("/youtube/channels", get(youtube_channels))
        .route("/youtube/playlistItems", get(youtube_playlist_items))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Configuration pointing every provider at the mock.
pub fn test_config(mock: SocketAddr) -> Config {
    let base = format!("http://{}", mock);
    let vars: HashMap<String, String> = [
        ("SESSION_SECRET", SESSION_SECRET.to_string()),
        ("POST_LOGIN_REDIRECT", DASHBOARD.to_string()),
        ("PINTEREST_CLIENT_ID", "pin-client".to_string()),
        ("PINTEREST_CLIENT_SECRET", "pin-secret".to_string()),
        ("PINTEREST_REDIRECT_URI", "http://localhost:3000/auth/pinterest/callback".to_string()),
        ("PINTEREST_AUTHORIZE_URL", format!("{}/oauth/authorize", base)),
        ("PINTEREST_TOKEN_URL", format!("{}/oauth/token", base)),
        ("PINTEREST_API_BASE", format!("{}/pinterest", base)),
        ("X_CLIENT_ID", "x-client".to_string()),
        ("X_REDIRECT_URI", "http://localhost:3000/auth/x/callback".to_string()),
        ("X_AUTHORIZE_URL", format!("{}/oauth/authorize", base)),
        ("X_TOKEN_URL", format!("{}/oauth/token", base)),
        ("X_API_BASE", format!("{}/x", base)),
        ("YOUTUBE_CLIENT_ID", "yt-client".to_string()),
        ("YOUTUBE_CLIENT_SECRET", "yt-secret".to_string()),
        ("YOUTUBE_REDIRECT_URI", "http://localhost:3000/auth/youtube/callback".to_string()),
        ("YOUTUBE_AUTHORIZE_URL", format!("{}/oauth/authorize", base)),
        ("YOUTUBE_TOKEN_URL", format!("{}/oauth/token", base)),
        ("YOUTUBE_API_BASE", format!("{}/youtube", base)),
        ("TUMBLR_CONSUMER_KEY", "tumblr-key".to_string()),
        ("TUMBLR_CONSUMER_SECRET", "tumblr-secret".to_string()),
        ("TUMBLR_CALLBACK_URL", "http://localhost:3000/auth/tumblr/callback".to_string()),
        ("TUMBLR_REQUEST_TOKEN_URL", format!("{}/tumblr/oauth/request_token", base)),
        ("TUMBLR_AUTHORIZE_URL", format!("{}/tumblr/oauth/authorize", base)),
        ("TUMBLR_ACCESS_TOKEN_URL", format!("{}/tumblr/oauth/access_token", base)),
        ("TUMBLR_API_BASE", format!("{}/tumblr/v2", base)),
        ("BLUESKY_SERVICE", base.clone()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    Config::from_vars(&move |key: &str| vars.get(key).cloned()).unwrap()
}

/// A running server plus a cookie-keeping browser that does not follow redirects.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub mock: Arc<MockProvider>,
    pub state: AppState,
}

impl TestContext {
    pub async fn new() -> Self {
        let mock = Arc::new(MockProvider::default());
        let mock_addr = spawn_mock(mock.clone()).await;

        let state =
            AppState::with_store(test_config(mock_addr), Arc::new(MemoryStore::new())).unwrap();
        let app = feedhub::router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            client: Self::browser(),
            base_url: format!("http://{}", addr),
            mock,
            state,
        }
    }

    /// A second, independent browser against the same server.
    pub fn browser() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Runs `/auth/{provider}/start` and returns the `state` sent to the provider.
    pub async fn start(&self, client: &reqwest::Client, provider: &str) -> url::Url {
        let response = client
            .get(self.url(&format!("/auth/{}/start", provider)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 303, "start should redirect");
        let location = response.headers()["location"].to_str().unwrap();
        url::Url::parse(location).unwrap()
    }

    /// Connects `provider` through the full start + callback round trip.
    pub async fn connect(&self, client: &reqwest::Client, provider: &str) {
        let authorize = self.start(client, provider).await;
        let state = query_param(&authorize, "state").unwrap();
        let response = client
            .get(self.url(&format!(
                "/auth/{}/callback?code=auth-code&state={}",
                provider, state
            )))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 303, "callback should redirect");
    }
}

pub fn query_param(url: &url::Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
