//! The access logger: policy state, template and sink.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use axum::http::Method;

use super::error::AccessLogError;
use super::item::LogItem;
use super::pattern::CompiledTemplate;
use super::pool::BufferPool;
use super::sink::LogSink;
use crate::net::local_ip;

/// Slow-request threshold applied until an administrator changes it.
pub const DEFAULT_SLOW_REQUEST_THRESHOLD: Duration = Duration::from_millis(1500);

/// Records one line per qualifying request.
///
/// Shared by reference (usually `Arc<AccessLogger>`) between every in-flight
/// request and the admin API. Policy fields are atomics; the template and
/// local IP never change after construction.
pub struct AccessLogger {
    enabled: AtomicBool,
    /// Nanoseconds; zero turns the slow-request path off.
    slow_request_threshold: AtomicU64,
    template: CompiledTemplate,
    local_ip: String,
    sink: Box<dyn LogSink>,
    buffers: BufferPool,
}

impl AccessLogger {
    /// Compile `pattern` and resolve the local IP.
    ///
    /// Logging starts enabled with [`DEFAULT_SLOW_REQUEST_THRESHOLD`].
    pub fn new(pattern: &str, sink: impl LogSink + 'static) -> Result<Self, AccessLogError> {
        let ip = local_ip().map_err(AccessLogError::LocalAddress)?;
        Self::with_local_ip(pattern, sink, ip)
    }

    /// Like [`AccessLogger::new`] with an already known local IP.
    pub fn with_local_ip(
        pattern: &str,
        sink: impl LogSink + 'static,
        local_ip: impl Into<String>,
    ) -> Result<Self, AccessLogError> {
        let template = CompiledTemplate::compile(pattern)?;
        Ok(Self {
            enabled: AtomicBool::new(true),
            slow_request_threshold: AtomicU64::new(as_nanos(DEFAULT_SLOW_REQUEST_THRESHOLD)),
            template,
            local_ip: local_ip.into(),
            sink: Box::new(sink),
            buffers: BufferPool::default(),
        })
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// `"enabled"` or `"disabled"`.
    pub fn status(&self) -> &'static str {
        if self.is_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    }

    /// Requests at least this slow are logged even while disabled.
    /// `Duration::ZERO` turns that off.
    pub fn set_slow_request_threshold(&self, threshold: Duration) {
        self.slow_request_threshold
            .store(as_nanos(threshold), Ordering::Relaxed);
    }

    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_nanos(self.slow_request_threshold.load(Ordering::Relaxed))
    }

    /// Whether a request should be timed and observed at all.
    ///
    /// `false` means the caller can skip every bit of access-log work.
    pub fn should_observe(&self, method: &Method) -> bool {
        if *method == Method::OPTIONS {
            return false;
        }
        self.is_enabled() || !self.slow_request_threshold().is_zero()
    }

    /// Whether a request that took `latency` gets a line.
    pub fn should_record(&self, latency: Duration) -> bool {
        if self.is_enabled() {
            return true;
        }
        let threshold = self.slow_request_threshold();
        !threshold.is_zero() && latency >= threshold
    }

    /// Render `item` and write it to the sink as one line.
    pub fn record(&self, item: &LogItem<'_>) -> Result<(), AccessLogError> {
        let mut buf = self.buffers.acquire();
        self.template.render(item, &self.local_ip, &mut buf)?;
        self.sink.write_line(&buf).map_err(AccessLogError::Sink)
    }

    pub fn template(&self) -> &CompiledTemplate {
        &self.template
    }

    pub fn local_ip(&self) -> &str {
        &self.local_ip
    }
}

impl std::fmt::Debug for AccessLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLogger")
            .field("enabled", &self.is_enabled())
            .field("slow_request_threshold", &self.slow_request_threshold())
            .field("template", &self.template.to_string())
            .field("local_ip", &self.local_ip)
            .finish_non_exhaustive()
    }
}

fn as_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
