//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section has defaults, so an empty file is a valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::access_log::{DEFAULT_PATTERN, JSON_PATTERN};

/// Root configuration for the access-logging server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Public API listener.
    pub api: ApiConfig,

    /// Admin API listener and credentials.
    pub admin: AdminConfig,

    /// Access-log pattern, sink and policy.
    pub access_log: AccessLogConfig,

    /// Diagnostic logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Public API listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Access-log configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Log every request. When false only slow requests are logged.
    pub enabled: bool,

    /// `"default"`, `"json"` or a literal pattern.
    pub pattern: String,

    /// Slow-request threshold in milliseconds; zero or negative disables it.
    pub slow_request_threshold_ms: i64,

    /// `"stdout"`, `"stderr"` or a file path opened for append.
    pub sink: String,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pattern: "default".to_string(),
            slow_request_threshold_ms: 1500,
            sink: "stdout".to_string(),
        }
    }
}

/// Where access lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl AccessLogConfig {
    /// The pattern text, with the built-in names resolved.
    pub fn pattern_source(&self) -> &str {
        match self.pattern.as_str() {
            "default" => DEFAULT_PATTERN,
            "json" => JSON_PATTERN,
            other => other,
        }
    }

    pub fn slow_request_threshold(&self) -> Duration {
        u64::try_from(self.slow_request_threshold_ms)
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO)
    }

    pub fn sink_target(&self) -> SinkTarget {
        match self.sink.as_str() {
            "stdout" => SinkTarget::Stdout,
            "stderr" => SinkTarget::Stderr,
            path => SinkTarget::File(PathBuf::from(path)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// `"pretty"` or `"json"`.
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
