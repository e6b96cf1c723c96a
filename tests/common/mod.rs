//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use access_logger::access_log::{AccessLogger, MemorySink};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// A logger writing to memory with a fixed local IP.
pub fn memory_logger(pattern: &str) -> (Arc<AccessLogger>, MemorySink) {
    let sink = MemorySink::new();
    let logger = AccessLogger::with_local_ip(pattern, sink.clone(), "10.0.0.1").unwrap();
    (Arc::new(logger), sink)
}

/// Send `request` through `router` and drain the response body.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}
