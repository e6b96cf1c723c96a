//! Access-log interceptor.
//!
//! Times each request, observes the response through a
//! [`ResponseRecorder`] and hands the finished request to the
//! [`AccessLogger`]. Bodies stream after the handler returns, so the line is
//! emitted when the body ends or is dropped.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, Version},
    middleware::Next,
    response::Response,
};
use bytes::Bytes;
use chrono::{DateTime, Local};
use http_body::{Body as HttpBody, Frame, SizeHint};

use crate::access_log::{AccessLogError, AccessLogger, LogItem};
use crate::http::observer::{ObserveResponse, ObserverError, ResponseRecorder, ResponseWriter};
use crate::observability::metrics;

/// Request header carrying the trace identifier.
pub const TRACE_CONTEXT_HEADER: HeaderName = HeaderName::from_static("x-cloud-trace-context");

/// Observer used for axum responses.
///
/// hyper's frame stream tracks nothing itself, so it gets the full wrapper.
pub type FrameObserver = ResponseRecorder<BodyFrames>;

/// Middleware function recording one access line per qualifying request.
///
/// Install with `axum::middleware::from_fn_with_state(logger, access_log_middleware)`.
pub async fn access_log_middleware(
    State(logger): State<Arc<AccessLogger>>,
    request: Request,
    next: Next,
) -> Response {
    if !logger.should_observe(request.method()) {
        return next.run(request).await;
    }

    let received_at = Local::now();
    let started = Instant::now();
    let snapshot = RequestSnapshot::capture(&request, &logger);

    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let mut observer = FrameObserver::with_status(BodyFrames, parts.status);
    if parts.status == StatusCode::SWITCHING_PROTOCOLS {
        // hyper performs the upgrade itself; only the accounting changes hands.
        if let Err(e) = observer.hijack() {
            tracing::debug!(error = %e, "Upgrade response not hijacked");
        }
    }
    let response_headers = if logger.template().uses_response_headers() {
        parts.headers.clone()
    } else {
        HeaderMap::new()
    };

    let completion = Completion {
        logger,
        request: snapshot,
        response_headers,
        observer,
        received_at,
        started,
    };
    Response::from_parts(parts, Body::new(AccessLogBody::new(body, completion)))
}

/// Request fields kept until the response completes.
#[derive(Debug)]
struct RequestSnapshot {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    remote_addr: String,
    trace_id: String,
    content_length: i64,
}

impl RequestSnapshot {
    fn capture(request: &Request, logger: &AccessLogger) -> Self {
        let headers = if logger.template().uses_request_headers() {
            let mut headers = request.headers().clone();
            if !headers.contains_key(header::HOST) {
                // HTTP/2 carries the host in the URI authority.
                if let Some(host) = request
                    .uri()
                    .authority()
                    .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
                {
                    headers.insert(header::HOST, host);
                }
            }
            headers
        } else {
            HeaderMap::new()
        };

        let trace_id = request
            .headers()
            .get(&TRACE_CONTEXT_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_default();

        let content_length = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .or_else(|| {
                request
                    .body()
                    .size_hint()
                    .exact()
                    .and_then(|n| i64::try_from(n).ok())
            })
            .unwrap_or(-1);

        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers,
            remote_addr,
            trace_id,
            content_length,
        }
    }
}

/// The response as hyper sees it: a head it writes itself plus data frames.
///
/// Nothing is tracked here; the wrapping recorder does the bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyFrames;

impl ResponseWriter for BodyFrames {
    type Conn = ();

    fn write_status(&mut self, _status: StatusCode) {}

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        Ok(data.len())
    }

    /// hyper flushes every frame it is handed.
    fn flush(&mut self) -> Result<(), ObserverError> {
        Ok(())
    }

    /// The connection is handed over by hyper's upgrade machinery.
    fn hijack(&mut self) -> Result<(), ObserverError> {
        Ok(())
    }
}

/// Everything needed to emit the line once the body is done.
struct Completion<O> {
    logger: Arc<AccessLogger>,
    request: RequestSnapshot,
    response_headers: HeaderMap,
    observer: O,
    received_at: DateTime<Local>,
    started: Instant,
}

impl<O> Completion<O>
where
    O: ObserveResponse + ResponseWriter,
{
    fn observe(&mut self, data: &Bytes) {
        if data.is_empty() {
            return;
        }
        if let Err(e) = self.observer.write(data) {
            // Frames after an upgrade are not part of the response.
            tracing::trace!(error = %e, len = data.len(), "Body frame not counted");
        }
    }

    fn finish(self) {
        let latency = self.started.elapsed();
        if !self.logger.should_record(latency) {
            return;
        }

        let item = LogItem {
            trace_id: &self.request.trace_id,
            content_length: self.request.content_length,
            uri: &self.request.uri,
            request_headers: &self.request.headers,
            response_headers: &self.response_headers,
            remote_addr: &self.request.remote_addr,
            method: &self.request.method,
            version: self.request.version,
            received_at: self.received_at,
            first_byte_time: self.observer.first_byte_time(),
            latency,
            bytes_sent: self.observer.size(),
            status: self.observer.status(),
        };

        match self.logger.record(&item) {
            Ok(()) => metrics::record_line_written(),
            Err(e @ AccessLogError::Sink(_)) => {
                tracing::warn!(error = %e, "Access log write failed");
                metrics::record_write_error();
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.request.uri.path(),
                    "Access log line dropped"
                );
                metrics::record_render_error();
            }
        }
    }
}

/// Response body that reports to the access logger when it completes.
pub struct AccessLogBody<B = Body, O = FrameObserver>
where
    O: ObserveResponse + ResponseWriter,
{
    inner: B,
    completion: Option<Completion<O>>,
}

impl<B, O> AccessLogBody<B, O>
where
    O: ObserveResponse + ResponseWriter,
{
    fn new(inner: B, completion: Completion<O>) -> Self {
        Self {
            inner,
            completion: Some(completion),
        }
    }

    fn finish(&mut self) {
        if let Some(completion) = self.completion.take() {
            completion.finish();
        }
    }
}

impl<B, O> HttpBody for AccessLogBody<B, O>
where
    B: HttpBody<Data = Bytes> + Unpin,
    O: ObserveResponse + ResponseWriter + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, B::Error>>> {
        let this = &mut *self;
        let polled = ready!(Pin::new(&mut this.inner).poll_frame(cx));
        match &polled {
            Some(Ok(frame)) => {
                if let (Some(data), Some(completion)) =
                    (frame.data_ref(), this.completion.as_mut())
                {
                    completion.observe(data);
                }
            }
            Some(Err(_)) | None => this.finish(),
        }
        Poll::Ready(polled)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B, O> Drop for AccessLogBody<B, O>
where
    O: ObserveResponse + ResponseWriter,
{
    fn drop(&mut self) {
        // Body never polled to the end: empty body, disconnect or upgrade.
        self.finish();
    }
}

impl<B, O> std::fmt::Debug for AccessLogBody<B, O>
where
    O: ObserveResponse + ResponseWriter,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLogBody")
            .field("pending", &self.completion.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_log::MemorySink;
    use crate::http::observer::{FirstByteRecorder, TrackedWriter};

    fn completion<O>(pattern: &str, observer: O) -> (Completion<O>, MemorySink) {
        let sink = MemorySink::new();
        let logger = AccessLogger::with_local_ip(pattern, sink.clone(), "10.0.0.1").unwrap();
        let request = Request::get("/upload").body(Body::empty()).unwrap();
        let completion = Completion {
            request: RequestSnapshot::capture(&request, &logger),
            logger: Arc::new(logger),
            response_headers: HeaderMap::new(),
            observer,
            received_at: Local::now(),
            started: Instant::now(),
        };
        (completion, sink)
    }

    /// A destination that already knows its status and size.
    struct CountingConn {
        status: StatusCode,
        size: u64,
    }

    impl ResponseWriter for CountingConn {
        type Conn = ();

        fn write_status(&mut self, status: StatusCode) {
            self.status = status;
        }

        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.size += data.len() as u64;
            Ok(data.len())
        }
    }

    impl TrackedWriter for CountingConn {
        fn status(&self) -> StatusCode {
            self.status
        }

        fn size(&self) -> u64 {
            self.size
        }
    }

    #[test]
    fn test_body_frames_under_full_recorder() {
        let mut frames = FrameObserver::with_status(BodyFrames, StatusCode::CREATED);
        assert_eq!(frames.status(), StatusCode::CREATED);
        assert_eq!(frames.size(), 0);
        assert!(frames.first_byte_time().is_none());

        frames.write(b"hello").unwrap();
        frames.write(b" world").unwrap();
        assert_eq!(frames.status(), StatusCode::CREATED);
        assert_eq!(frames.size(), 11);
        assert!(frames.first_byte_time().is_some());
        assert!(frames.flush().is_ok());
    }

    #[test]
    fn test_completion_with_tracked_destination() {
        let observer = FirstByteRecorder::new(CountingConn {
            status: StatusCode::ACCEPTED,
            size: 0,
        });
        let (completion, sink) = completion("%s %U %b", observer);
        let mut body = AccessLogBody::new(Body::empty(), completion);

        if let Some(completion) = body.completion.as_mut() {
            completion.observe(&Bytes::from_static(b"abcd"));
            completion.observe(&Bytes::new());
        }
        drop(body);

        assert_eq!(sink.lines(), vec!["202 /upload 4"]);
    }

    #[test]
    fn test_hijacked_completion_counts_nothing() {
        let mut observer = FrameObserver::with_status(BodyFrames, StatusCode::SWITCHING_PROTOCOLS);
        observer.hijack().unwrap();
        let (mut completion, sink) = completion("%s %b %B %F", observer);

        completion.observe(&Bytes::from_static(b"raw protocol bytes"));
        completion.finish();

        assert_eq!(sink.lines(), vec!["101 - 0 -"]);
    }
}
