//! Access-log recording engine.
//!
//! # Data Flow
//! ```text
//! pattern string
//!     → pattern.rs (compile once into CompiledTemplate)
//!
//! per request (driven by http::middleware::access_log):
//!     → logger.rs (should_observe / should_record policy)
//!     → item.rs (LogItem snapshot)
//!     → render.rs (placeholders → pooled buffer from pool.rs)
//!     → sink.rs (one write per line)
//! ```
//!
//! # Design Decisions
//! - Placeholders are a closed enum resolved by one exhaustive match
//! - Policy state is atomic; admin updates apply from the next decision on
//! - Render and sink failures lose one line and never reach the client

pub mod error;
pub mod item;
pub mod logger;
pub mod pattern;
pub mod pool;
pub mod render;
pub mod sink;

pub use error::AccessLogError;
pub use item::LogItem;
pub use logger::{AccessLogger, DEFAULT_SLOW_REQUEST_THRESHOLD};
pub use pattern::{CompiledTemplate, PatternError, Placeholder, DEFAULT_PATTERN, JSON_PATTERN};
pub use sink::{append_file, LogSink, MemorySink};
