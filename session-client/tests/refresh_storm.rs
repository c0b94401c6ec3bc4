mod common;

use axum::http::{header::COOKIE, HeaderMap};
use common::{expired, invalid, session_cookie, token_pair, transport};
use serde_json::{json, Value};
use session_client::api::{ApiError, AuthFailureStrategy, ClientFactory};
use session_client::session::{
    HistoryNavigator, MemoryCookieStore, RequestContext, SessionStore, TokenPair, SIGN_IN_PATH,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STORM: usize = 8;

fn browser_factory(base_url: &str) -> (ClientFactory, SessionStore, Arc<HistoryNavigator>) {
    let cookies = Arc::new(MemoryCookieStore::new());
    let store = SessionStore::new(cookies.clone());
    store.write(&TokenPair::new("stale", "refresh-1"));
    let navigator = Arc::new(HistoryNavigator::new());
    let factory = ClientFactory::new(
        transport(base_url),
        cookies,
        AuthFailureStrategy::Interactive(navigator.clone()),
    );
    (factory, store, navigator)
}

async fn mount_me(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "diego@rocketseat.team",
            "permissions": ["users.list"],
            "roles": ["administrator"],
        })))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(expired())
        .mount(server)
        .await;
}

#[tokio::test]
async fn storm_of_expired_requests_refreshes_once() {
    let server = MockServer::start().await;
    mount_me(&server).await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(header("authorization", "Bearer stale"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(token_pair("fresh", "refresh-2").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let (factory, store, navigator) = browser_factory(&server.uri());
    let client = factory.build(None);

    let requests: Vec<_> = (0..STORM)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get::<Value>("/me").await })
        })
        .collect();

    for request in requests {
        let profile = request.await.unwrap().unwrap();
        assert_eq!(profile["email"], "diego@rocketseat.team");
    }

    assert_eq!(store.read(), Some(TokenPair::new("fresh", "refresh-2")));
    assert!(navigator.history().is_empty());
    assert!(!client.coordinator().is_refreshing().await);
}

#[tokio::test]
async fn clients_of_one_server_request_refresh_once() {
    let server = MockServer::start().await;
    mount_me(&server).await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(token_pair("fresh", "refresh-2").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let (factory, browser_store, _) = browser_factory(&server.uri());
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, session_cookie("stale", "refresh-1").parse().unwrap());
    let context = RequestContext::from_headers(&headers);

    let profile = factory.build(Some(&context));
    let permissions = factory.build(Some(&context));
    let (first, second) = tokio::join!(
        profile.get::<Value>("/me"),
        permissions.get::<Value>("/me"),
    );

    assert_eq!(first.unwrap()["email"], "diego@rocketseat.team");
    assert_eq!(second.unwrap()["email"], "diego@rocketseat.team");
    assert_eq!(
        context.session_store().read(),
        Some(TokenPair::new("fresh", "refresh-2"))
    );
    // The browser session is a different coordinator and store
    assert_eq!(browser_store.access_token().as_deref(), Some("stale"));
}

#[tokio::test]
async fn failed_refresh_rejects_every_waiter() {
    let server = MockServer::start().await;
    mount_me(&server).await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(invalid().set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let (factory, store, _) = browser_factory(&server.uri());
    let client = factory.build(None);

    let requests: Vec<_> = (0..STORM)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get::<Value>("/me").await })
        })
        .collect();

    for request in requests {
        let err = request.await.unwrap().unwrap_err();
        match err {
            ApiError::RefreshFailed(inner) => assert_eq!(inner.status(), Some(401)),
            other => panic!("unexpected error: {other}"),
        }
    }

    // A failed refresh leaves the stored pair alone
    assert_eq!(store.access_token().as_deref(), Some("stale"));
}

#[tokio::test]
async fn invalid_token_signs_browser_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(invalid())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(token_pair("fresh", "refresh-2"))
        .expect(0)
        .mount(&server)
        .await;

    let (factory, store, navigator) = browser_factory(&server.uri());

    let err = factory.build(None).get::<Value>("/me").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(store.read(), None);
    assert_eq!(navigator.current().as_deref(), Some(SIGN_IN_PATH));
}

#[tokio::test]
async fn non_auth_errors_are_returned_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let (factory, store, navigator) = browser_factory(&server.uri());

    let err = factory.build(None).get::<Value>("/me").await.unwrap_err();

    match err {
        ApiError::Http { status, code, body } => {
            assert_eq!(status, 503);
            assert_eq!(code, None);
            assert_eq!(body, Value::String("maintenance".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.read().is_some());
    assert!(navigator.history().is_empty());
}
