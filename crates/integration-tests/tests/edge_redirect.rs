//! End-to-end tests of the edge router.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{CACHE_CONTROL, HOST, LOCATION, USER_AGENT},
    },
};
use community_edge::{AppState, EdgeConfig};
use community_integration_tests::{DESKTOP_CHROME, IPHONE_SAFARI};
use tempfile::TempDir;
use tower::ServiceExt;

fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>community</h1>").unwrap();
    dir
}

fn app(site: &TempDir) -> Router {
    community_edge::app(AppState::new(EdgeConfig {
        site_dir: site.path().to_path_buf(),
        ..EdgeConfig::default()
    }))
}

fn request(host: &str, uri: &str, user_agent: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(HOST, host)
        .header(USER_AGENT, user_agent)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_mobile_on_desktop_host_gets_temporary_redirect() {
    let site = site();
    let response = app(&site)
        .oneshot(request("www.community.com", "/posts/7?tab=comments", IPHONE_SAFARI))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "https://m.community.com/posts/7?tab=comments"
    );
    assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "no-store");
}

#[tokio::test]
async fn test_desktop_on_mobile_host_gets_permanent_redirect() {
    let site = site();
    let response = app(&site)
        .oneshot(request("m.community.com", "/", DESKTOP_CHROME))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "https://www.community.com/"
    );
    assert_eq!(
        response.headers().get(CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
}

#[tokio::test]
async fn test_in_app_request_passes_through() {
    let site = site();
    let request = Request::builder()
        .uri("/")
        .header(HOST, "m.community.com")
        .header(USER_AGENT, DESKTOP_CHROME)
        .header("x-requested-with", "ReactNativeWebView")
        .body(Body::empty())
        .unwrap();

    let response = app(&site).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(LOCATION).is_none());
}

#[tokio::test]
async fn test_bare_host_promoted_for_mobile() {
    let site = site();
    let response = app(&site)
        .oneshot(request("community.com", "/about", IPHONE_SAFARI))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "https://m.community.com/about"
    );
}

#[tokio::test]
async fn test_forwarded_proto_sets_scheme() {
    let site = site();
    let request = Request::builder()
        .uri("/")
        .header(HOST, "m.community.com")
        .header(USER_AGENT, DESKTOP_CHROME)
        .header("x-forwarded-proto", "http")
        .body(Body::empty())
        .unwrap();

    let response = app(&site).oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "http://www.community.com/"
    );
}

#[tokio::test]
async fn test_local_hosts_pass_through() {
    let site = site();
    for host in ["localhost:3000", "127.0.0.1:3000"] {
        let response = app(&site)
            .oneshot(request(host, "/", IPHONE_SAFARI))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "host {host}");
    }
}

#[tokio::test]
async fn test_exempt_paths_are_not_redirected() {
    let site = site();
    let response = app(&site)
        .oneshot(request("www.community.com", "/health", IPHONE_SAFARI))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&site)
        .oneshot(request("www.community.com", "/api/v1/posts", IPHONE_SAFARI))
        .await
        .unwrap();
    assert!(response.headers().get(LOCATION).is_none());
}

#[tokio::test]
async fn test_right_surface_serves_site() {
    let site = site();
    let response = app(&site)
        .oneshot(request("m.community.com", "/", IPHONE_SAFARI))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let site = site();
    let request = Request::builder()
        .uri("/health")
        .header(HOST, "www.community.com")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();

    let response = app(&site).oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-123");
}

#[tokio::test]
async fn test_readiness_tracks_site_dir() {
    let site = site();
    let response = app(&site)
        .oneshot(request("www.community.com", "/health/ready", DESKTOP_CHROME))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let missing = community_edge::app(AppState::new(EdgeConfig {
        site_dir: site.path().join("does-not-exist"),
        ..EdgeConfig::default()
    }));
    let response = missing
        .oneshot(request("www.community.com", "/health/ready", DESKTOP_CHROME))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
