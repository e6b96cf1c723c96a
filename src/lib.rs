//! Configurable HTTP access logging for axum services.

pub mod access_log;
pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use access_log::AccessLogger;
pub use config::schema::ServerConfig;
pub use http::{with_access_log, with_panic_recovery, HttpServer};
pub use lifecycle::Shutdown;
