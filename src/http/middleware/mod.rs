//! Tower/axum middleware.

pub mod access_log;

pub use access_log::{
    access_log_middleware, AccessLogBody, BodyFrames, FrameObserver, TRACE_CONTEXT_HEADER,
};
