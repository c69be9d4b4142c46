// tests/api_http.rs
//
// HTTP-level tests for the admin control surface without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt; // for `oneshot`

use newsdesk_crawler::api::AppState;
use newsdesk_crawler::config::AppConfig;
use newsdesk_crawler::create_router;

const KEY: &str = "test-key";

fn test_app(dir: &std::path::Path) -> Router {
    let state = AppState {
        cfg: Arc::new(AppConfig::with_data_dir(dir)),
        admin_key: Arc::new(KEY.to_string()),
    };
    create_router(state)
}

fn req(method: &str, uri: &str, key: Option<&str>, body: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method(method).uri(uri);
    if let Some(k) = key {
        b = b.header("x-admin-key", k);
    }
    if body.is_some() {
        b = b.header("content-type", "application/json");
    }
    b.body(body.map(|s| Body::from(s.to_string())).unwrap_or_else(Body::empty))
        .unwrap()
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_is_open_but_api_requires_the_key() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(tmp.path());

    let resp = app
        .clone()
        .oneshot(req("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(req("GET", "/api/status", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(req("GET", "/api/status", Some("wrong"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(req("GET", "/api/status", Some(KEY), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let s = body_string(resp).await;
    assert!(s.contains("\"Healthy\""), "body: {s}");
}

#[tokio::test]
async fn sources_crud_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(tmp.path());

    let resp = app
        .clone()
        .oneshot(req(
            "POST",
            "/api/sources",
            Some(KEY),
            Some(r#"{"name":"BBC","url":"https://feeds.bbci.co.uk/news/rss.xml"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Missing fields are rejected, not written.
    let resp = app
        .clone()
        .oneshot(req(
            "POST",
            "/api/sources",
            Some(KEY),
            Some(r#"{"name":"X"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(req("GET", "/api/sources", Some(KEY), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let s = body_string(resp).await;
    assert!(s.contains("BBC"));
    assert!(!s.contains("\"X\""));

    let resp = app
        .clone()
        .oneshot(req("DELETE", "/api/sources/BBC", Some(KEY), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(req("DELETE", "/api/sources/BBC", Some(KEY), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn topics_written_through_the_api_reach_the_crawler_config() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(tmp.path());

    let resp = app
        .clone()
        .oneshot(req(
            "PUT",
            "/api/topics",
            Some(KEY),
            Some(r#"{"topics":["Tech","Climate"]}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(req("GET", "/api/topics", Some(KEY), None))
        .await
        .unwrap();
    let s = body_string(resp).await;
    assert!(s.contains("Tech") && s.contains("Climate"));

    // Same document the crawler reads at run start.
    let cfg = AppConfig::with_data_dir(tmp.path());
    assert_eq!(
        cfg.load_topics(),
        vec!["Tech".to_string(), "Climate".to_string()]
    );
}

#[tokio::test]
async fn visuals_merge_keeps_unpatched_keys() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(tmp.path());

    let resp = app
        .clone()
        .oneshot(req(
            "POST",
            "/api/visuals",
            Some(KEY),
            Some(r#"{"theme":"light"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let s = body_string(resp).await;
    assert!(s.contains("\"light\""), "body: {s}");
    assert!(s.contains("\"grid\""), "defaults survive the merge: {s}");
}
