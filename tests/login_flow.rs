use anteroom::api::{router, ApiState};
use anteroom::onetime::OneTime;
use anteroom::provider::{Identity, IdentityProvider};
use anteroom::session;
use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

const ONETIME_KEY: [u8; 32] = [7u8; 32];
const SESSION_KEY: [u8; 32] = [42u8; 32];

struct MockProvider {
    identity: Identity,
    fail_exchange: AtomicBool,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            identity: Identity {
                id: 1234,
                username: "alice".to_string(),
                avatar: "a1b2c3".to_string(),
            },
            fail_exchange: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    fn authorize_url(&self, state: &str) -> String {
        let mut url = Url::parse("https://idp.example.com/oauth2/authorize").expect("static URL");
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("state", state);
        url.to_string()
    }

    async fn exchange(&self, code: &str) -> Result<Identity> {
        if self.fail_exchange.load(Ordering::SeqCst) {
            bail!("provider temporarily unavailable");
        }
        if code != "good-code" {
            bail!("unknown authorization code");
        }
        Ok(self.identity.clone())
    }
}

fn state_with(provider: Arc<MockProvider>) -> Arc<ApiState> {
    Arc::new(ApiState {
        onetime: OneTime::new(ONETIME_KEY, 64),
        sessions: session::Issuer::new(SESSION_KEY),
        provider,
        cookie_secure: true,
    })
}

async fn get(state: &Arc<ApiState>, uri: &str) -> axum::response::Response {
    get_with_cookie(state, uri, None).await
}

async fn get_with_cookie(
    state: &Arc<ApiState>,
    uri: &str,
    cookie: Option<&str>,
) -> axum::response::Response {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    router(Arc::clone(state))
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("response")
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Pull the one-time token out of the authorization URL the login handler
/// redirects to.
fn state_param(authorize_url: &str) -> String {
    let url = Url::parse(authorize_url).expect("authorize URL");
    url.query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state parameter")
}

#[tokio::test]
async fn health_reports_app_header() {
    let state = state_with(Arc::new(MockProvider::new()));
    let response = get(&state, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-App"));
}

#[tokio::test]
async fn root_reports_unauthenticated() {
    let state = state_with(Arc::new(MockProvider::new()));
    let response = get(&state, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["authenticated"], false);
    assert_eq!(json["identity"], serde_json::Value::Null);
}

#[tokio::test]
async fn login_redirects_to_provider_with_one_time_state() {
    let state = state_with(Arc::new(MockProvider::new()));
    let response = get(&state, "/login").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let one_time = state_param(&location(&response));
    assert!(one_time.starts_with("v0:"));
}

#[tokio::test]
async fn me_without_cookie_is_unauthorized() {
    let state = state_with(Arc::new(MockProvider::new()));
    let response = get(&state, "/me").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_login_flow_and_replay_rejection() {
    let state = state_with(Arc::new(MockProvider::new()));

    let login = get(&state, "/login").await;
    let one_time = state_param(&location(&login));

    let redirect_uri = format!("/redirect?code=good-code&state={one_time}");
    let redirect = get(&state, &redirect_uri).await;
    assert_eq!(redirect.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&redirect), "/");

    let cookie = redirect
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie");
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));

    // first attribute only, as the browser would send it back
    let session_pair = cookie.split(';').next().expect("cookie pair");
    let me = get_with_cookie(&state, "/me", Some(session_pair)).await;
    assert_eq!(me.status(), StatusCode::OK);
    let body = to_bytes(me.into_body(), usize::MAX).await.expect("body");
    let identity: Identity = serde_json::from_slice(&body).expect("identity");
    assert_eq!(identity.id, 1234);
    assert_eq!(identity.username, "alice");

    let root = get_with_cookie(&state, "/", Some(session_pair)).await;
    let body = to_bytes(root.into_body(), usize::MAX).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["authenticated"], true);

    // replaying the consumed one-time token must fail
    let replay = get(&state, &redirect_uri).await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn failed_exchange_leaves_token_retryable() {
    let provider = Arc::new(MockProvider::new());
    let state = state_with(Arc::clone(&provider));

    let login = get(&state, "/login").await;
    let one_time = state_param(&location(&login));

    provider.fail_exchange.store(true, Ordering::SeqCst);
    let redirect = get(&state, &format!("/redirect?code=good-code&state={one_time}")).await;
    assert_eq!(redirect.status(), StatusCode::UNAUTHORIZED);

    // the token was checked but not consumed, so the retry succeeds
    provider.fail_exchange.store(false, Ordering::SeqCst);
    let retry = get(&state, &format!("/redirect?code=good-code&state={one_time}")).await;
    assert_eq!(retry.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn redirect_with_denied_access_returns_to_login() {
    let state = state_with(Arc::new(MockProvider::new()));
    let response = get(&state, "/redirect?error=access_denied").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn redirect_with_provider_error_is_unauthorized() {
    let state = state_with(Arc::new(MockProvider::new()));
    let response = get(
        &state,
        "/redirect?error=server_error&error_description=boom",
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn redirect_without_parameters_is_unauthorized() {
    let state = state_with(Arc::new(MockProvider::new()));
    let response = get(&state, "/redirect").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn redirect_with_forged_state_is_unauthorized() {
    let state = state_with(Arc::new(MockProvider::new()));
    let response = get(&state, "/redirect?code=good-code&state=v0:forged").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let state = state_with(Arc::new(MockProvider::new()));
    let response = get(&state, "/logout").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login");
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("clear cookie");
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn authenticated_login_bounces_home() {
    let state = state_with(Arc::new(MockProvider::new()));
    let credential = state.sessions.issue(&Identity {
        id: 1234,
        username: "alice".to_string(),
        avatar: String::new(),
    });

    let response = get_with_cookie(&state, "/login", Some(&format!("token={credential}"))).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/");
}
