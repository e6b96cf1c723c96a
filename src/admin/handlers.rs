use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::access_log::AccessLogger;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub access_log: AccessLogStatus,
}

#[derive(Debug, Serialize)]
pub struct AccessLogStatus {
    pub status: &'static str,
    pub slow_request_threshold_ms: u64,
}

pub async fn get_status(State(logger): State<Arc<AccessLogger>>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        access_log: AccessLogStatus {
            status: logger.status(),
            slow_request_threshold_ms: u64::try_from(logger.slow_request_threshold().as_millis())
                .unwrap_or(u64::MAX),
        },
    })
}

pub async fn get_access_log_status(State(logger): State<Arc<AccessLogger>>) -> &'static str {
    logger.status()
}

/// `disabled` (any case) turns full logging off; anything else turns it on.
pub async fn set_access_log_status(
    State(logger): State<Arc<AccessLogger>>,
    Path(status): Path<String>,
) -> &'static str {
    if status.eq_ignore_ascii_case("disabled") {
        logger.disable();
    } else {
        logger.enable();
    }
    tracing::info!(enabled = logger.is_enabled(), "Access log status updated");
    logger.status()
}

pub async fn set_slow_request_threshold(
    State(logger): State<Arc<AccessLogger>>,
    Path(duration): Path<String>,
) -> (StatusCode, String) {
    match duration.parse::<u64>() {
        Ok(ms) => {
            logger.set_slow_request_threshold(Duration::from_millis(ms));
            tracing::info!(threshold_ms = ms, "Slow request threshold updated");
            (
                StatusCode::OK,
                format!(
                    "duration threshold of slow request's access_log is updated, new threshold is {ms} milliseconds."
                ),
            )
        }
        Err(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "duration threshold(ms) param is invalid.".to_string(),
        ),
    }
}
