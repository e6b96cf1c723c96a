mod common;

use std::time::Duration;

use access_logger::with_access_log;
use axum::{routing::get, Router};
use tokio::task::JoinSet;

use common::{get as get_request, memory_logger, send};

fn app() -> Router {
    Router::new().route(
        "/ping",
        get(|| async {
            tokio::task::yield_now().await;
            "pong"
        }),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_while_policy_changes() {
    let (logger, sink) = memory_logger("%s %r %b");
    let router = with_access_log(app(), logger.clone());

    let mutator = {
        let logger = logger.clone();
        tokio::spawn(async move {
            for i in 0..200u64 {
                logger.set_slow_request_threshold(Duration::from_millis(i % 7));
                tokio::task::yield_now().await;
            }
        })
    };

    let mut requests = JoinSet::new();
    for i in 0..100 {
        let router = router.clone();
        requests.spawn(async move { send(&router, get_request(&format!("/ping?n={i}"))).await });
    }
    while let Some(result) = requests.join_next().await {
        let (_, body) = result.unwrap();
        assert_eq!(body, "pong");
    }
    mutator.await.unwrap();

    // Enabled the whole time: every request logged, no torn lines.
    let lines = sink.lines();
    assert_eq!(lines.len(), 100);
    for line in &lines {
        assert!(line.starts_with("200 GET /ping?n="), "bad line: {line}");
        assert!(line.ends_with(" 4"), "bad line: {line}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggling_keeps_lines_whole() {
    let (logger, sink) = memory_logger("%s %U");
    logger.set_slow_request_threshold(Duration::ZERO);
    let router = with_access_log(app(), logger.clone());

    let toggler = {
        let logger = logger.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                if i % 2 == 0 {
                    logger.disable();
                } else {
                    logger.enable();
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let mut requests = JoinSet::new();
    for _ in 0..100 {
        let router = router.clone();
        requests.spawn(async move { send(&router, get_request("/ping")).await });
    }
    while requests.join_next().await.is_some() {}
    toggler.await.unwrap();

    let lines = sink.lines();
    assert!(lines.len() <= 100);
    assert!(lines.iter().all(|line| line == "200 /ping"));
}
