//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum router, trace, panic recovery and timeout layers)
//!     → middleware/access_log.rs (time, observe, record)
//!     → handler
//!     → observer.rs (status, size, first-byte time of the response)
//! ```

pub mod middleware;
pub mod observer;
pub mod server;

pub use middleware::access_log_middleware;
pub use observer::{FirstByteRecorder, ObserveResponse, ObserverError, ResponseRecorder};
pub use server::{with_access_log, with_panic_recovery, HttpServer};
