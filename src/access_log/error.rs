//! Access logger error definitions.

use std::io;

use thiserror::Error;

use super::pattern::PatternError;
use super::render::RenderError;

/// Errors that can occur while building a logger or emitting a line.
#[derive(Debug, Error)]
pub enum AccessLogError {
    /// The pattern failed to compile. Construction-time.
    #[error("invalid access log pattern: {0}")]
    Pattern(#[from] PatternError),

    /// The server's own address could not be determined. Construction-time.
    #[error("failed to resolve local IP: {0}")]
    LocalAddress(#[source] io::Error),

    /// A line could not be rendered; only that line is lost.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The sink rejected a line; only that line is lost.
    #[error("failed to write access log line: {0}")]
    Sink(#[source] io::Error),
}
