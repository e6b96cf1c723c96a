//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured diagnostic events)
//!     → metrics.rs (access-log counters)
//!
//! Consumers:
//!     → stdout / log aggregation
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! Access lines themselves never go through `tracing`; they are written to
//! the access logger's sink.

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
