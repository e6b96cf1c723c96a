//! Per-request snapshot rendered into one access line.

use std::time::Duration;

use axum::http::{HeaderMap, Method, StatusCode, Uri, Version};
use chrono::{DateTime, Local};

/// Everything a template can reference about one finished request.
///
/// Built once at completion and only read afterwards. Header maps and the
/// URI are borrowed from the request/response snapshot held by the caller.
#[derive(Debug, Clone)]
pub struct LogItem<'a> {
    /// Value of the trace-context request header, empty when absent.
    pub trace_id: &'a str,
    /// Request content length, `-1` when unknown.
    pub content_length: i64,
    pub uri: &'a Uri,
    pub request_headers: &'a HeaderMap,
    pub response_headers: &'a HeaderMap,
    /// Client IP without port.
    pub remote_addr: &'a str,
    pub method: &'a Method,
    pub version: Version,
    pub received_at: DateTime<Local>,
    /// First byte written to the response, if any was.
    pub first_byte_time: Option<DateTime<Local>>,
    pub latency: Duration,
    pub bytes_sent: u64,
    pub status: StatusCode,
}

impl LogItem<'_> {
    /// Milliseconds between receiving the request and its first response byte.
    pub fn time_to_first_byte_ms(&self) -> Option<i64> {
        self.first_byte_time
            .map(|first| (first - self.received_at).num_milliseconds().max(0))
    }

    /// Path plus `?query` when a query is present.
    pub fn request_uri(&self) -> &str {
        self.uri
            .path_and_query()
            .map_or_else(|| self.uri.path(), |pq| pq.as_str())
    }
}
