mod common;

use std::time::Duration;

use access_logger::admin::setup_admin_router;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};

use common::{memory_logger, send};

const KEY: &str = "test-key";

fn admin_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_requires_bearer_token() {
    let (logger, _) = memory_logger("%s");
    let router = setup_admin_router(logger, KEY);

    let request = Request::get("/access_log/status").body(Body::empty()).unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::get("/access_log/status")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&router, admin_request(Method::GET, "/access_log/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "enabled");
}

#[tokio::test]
async fn test_toggle_status() {
    let (logger, _) = memory_logger("%s");
    let router = setup_admin_router(logger.clone(), KEY);

    let (_, body) = send(&router, admin_request(Method::POST, "/access_log/status/DISABLED")).await;
    assert_eq!(body, "disabled");
    assert!(!logger.is_enabled());

    let (_, body) = send(&router, admin_request(Method::GET, "/access_log/status")).await;
    assert_eq!(body, "disabled");

    // Anything other than "disabled" enables.
    let (_, body) = send(&router, admin_request(Method::POST, "/access_log/status/whatever")).await;
    assert_eq!(body, "enabled");
    assert!(logger.is_enabled());
}

#[tokio::test]
async fn test_set_threshold() {
    let (logger, _) = memory_logger("%s");
    let router = setup_admin_router(logger.clone(), KEY);

    let (status, body) = send(
        &router,
        admin_request(Method::POST, "/access_log/slow_request_log/threshold/250"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        "duration threshold of slow request's access_log is updated, new threshold is 250 milliseconds."
    );
    assert_eq!(logger.slow_request_threshold(), Duration::from_millis(250));

    for invalid in ["abc", "-5", "1.5"] {
        let (status, body) = send(
            &router,
            admin_request(
                Method::POST,
                &format!("/access_log/slow_request_log/threshold/{invalid}"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, "duration threshold(ms) param is invalid.");
    }
    assert_eq!(logger.slow_request_threshold(), Duration::from_millis(250));
}

#[tokio::test]
async fn test_admin_status_json() {
    let (logger, _) = memory_logger("%s");
    logger.disable();
    let router = setup_admin_router(logger, KEY);

    let (status, body) = send(&router, admin_request(Method::GET, "/admin/status")).await;
    assert_eq!(status, StatusCode::OK);

    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(value["status"], "operational");
    assert_eq!(value["access_log"]["status"], "disabled");
    assert_eq!(value["access_log"]["slow_request_threshold_ms"], 1500);
}

#[tokio::test]
async fn test_admin_traffic_is_access_logged() {
    let (logger, sink) = memory_logger("%s %m %U");
    let router = setup_admin_router(logger, KEY);

    send(&router, admin_request(Method::GET, "/access_log/status")).await;
    let request = Request::get("/admin/status").body(Body::empty()).unwrap();
    send(&router, request).await;

    assert_eq!(
        sink.lines(),
        vec!["200 GET /access_log/status", "401 GET /admin/status"]
    );
}
