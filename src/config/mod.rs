//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads and validates
//!     → lifecycle applies the access-log policy to the running logger
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Only the access-log policy is hot-reloadable; listeners, pattern and
//!   sink are fixed at startup

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AccessLogConfig, AdminConfig, ApiConfig, ObservabilityConfig, ServerConfig, SinkTarget,
};
pub use validation::ValidationError;
pub use watcher::ConfigWatcher;
