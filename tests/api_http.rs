// tests/api_http.rs
//
// HTTP-level tests for the liveness router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use strong_news_signals::api;

const BODY_LIMIT: usize = 1024 * 1024;

async fn get_json(uri: &str) -> (StatusCode, Json) {
    let app = api::router(None);
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");

    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Json = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

#[tokio::test]
async fn root_acknowledges_with_service_name() {
    let (status, v) = get_json("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["ok"], Json::Bool(true));
    assert_eq!(v["service"], "strong-news-signals");
}

#[tokio::test]
async fn health_returns_ok_true() {
    let (status, v) = get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, serde_json::json!({ "ok": true }));
}

#[tokio::test]
async fn metrics_not_mounted_without_debug_routes() {
    let app = api::router(None);
    let req = Request::get("/metrics").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
