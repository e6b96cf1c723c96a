//! Response observation.
//!
//! # Responsibilities
//! - Record final status, bytes written and first-byte time of one response
//! - Pass every byte, flush and hijack through unchanged
//!
//! # Design Decisions
//! - One contract ([`ObserveResponse`]) with two implementations:
//!   [`ResponseRecorder`] for writers that track nothing themselves, and
//!   [`FirstByteRecorder`] for writers that already track status and size
//! - Unsupported flush/hijack surface as errors, never as panics
//! - A hijacked recorder stops counting: the connection is no longer a
//!   response

use std::io;

use axum::http::StatusCode;
use chrono::{DateTime, Local};
use thiserror::Error;

/// Errors surfaced by observed writers.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// The underlying writer cannot perform this operation.
    #[error("response writer does not support {0}")]
    CapabilityUnsupported(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Destination of one HTTP response: status first, then body bytes.
pub trait ResponseWriter {
    /// What a successful hijack hands back.
    type Conn;

    fn write_status(&mut self, status: StatusCode);

    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> Result<(), ObserverError> {
        Err(ObserverError::CapabilityUnsupported("flush"))
    }

    /// Take over the connection for a raw byte-level protocol.
    fn hijack(&mut self) -> Result<Self::Conn, ObserverError> {
        Err(ObserverError::CapabilityUnsupported("hijack"))
    }
}

/// A writer that natively records status and size.
pub trait TrackedWriter: ResponseWriter {
    fn status(&self) -> StatusCode;
    fn size(&self) -> u64;
}

/// What the access logger needs to know about a response.
pub trait ObserveResponse {
    fn status(&self) -> StatusCode;
    /// Body bytes actually handed to the underlying writer.
    fn size(&self) -> u64;
    /// `None` until a status or body byte is written.
    fn first_byte_time(&self) -> Option<DateTime<Local>>;
}

/// Full wrapper: tracks status, size and first-byte time itself.
#[derive(Debug)]
pub struct ResponseRecorder<W> {
    inner: W,
    /// `None` until the first body write.
    size: Option<u64>,
    status: StatusCode,
    first_byte_time: Option<DateTime<Local>>,
    hijacked: bool,
}

impl<W: ResponseWriter> ResponseRecorder<W> {
    /// Status defaults to 200 until one is written.
    pub fn new(inner: W) -> Self {
        Self::with_status(inner, StatusCode::OK)
    }

    /// Recorder whose head is decided but not yet on the wire.
    ///
    /// The first body write commits `status` instead of 200.
    pub fn with_status(inner: W, status: StatusCode) -> Self {
        Self {
            inner,
            size: None,
            status,
            first_byte_time: None,
            hijacked: false,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn is_hijacked(&self) -> bool {
        self.hijacked
    }
}

impl<W: ResponseWriter> ResponseWriter for ResponseRecorder<W> {
    type Conn = W::Conn;

    fn write_status(&mut self, status: StatusCode) {
        // The head goes out once; later status changes are ignored.
        if self.first_byte_time.is_some() || self.hijacked {
            return;
        }
        self.inner.write_status(status);
        self.status = status;
        self.first_byte_time = Some(Local::now());
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.hijacked {
            return Err(io::Error::other("response writer was hijacked"));
        }
        if self.first_byte_time.is_none() {
            self.write_status(self.status);
        }
        let n = self.inner.write(data)?;
        *self.size.get_or_insert(0) += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), ObserverError> {
        self.inner.flush()
    }

    /// After a successful hijack the connection belongs to the caller:
    /// later writes fail and are not counted.
    fn hijack(&mut self) -> Result<Self::Conn, ObserverError> {
        self.size.get_or_insert(0);
        let conn = self.inner.hijack()?;
        self.hijacked = true;
        Ok(conn)
    }
}

impl<W> ObserveResponse for ResponseRecorder<W> {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn size(&self) -> u64 {
        self.size.unwrap_or(0)
    }

    fn first_byte_time(&self) -> Option<DateTime<Local>> {
        self.first_byte_time
    }
}

/// Thin decorator: adds first-byte time to a [`TrackedWriter`].
#[derive(Debug)]
pub struct FirstByteRecorder<W> {
    inner: W,
    first_byte_time: Option<DateTime<Local>>,
}

impl<W: TrackedWriter> FirstByteRecorder<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            first_byte_time: None,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    fn mark_first_byte(&mut self) {
        if self.first_byte_time.is_none() {
            self.first_byte_time = Some(Local::now());
        }
    }
}

impl<W: TrackedWriter> ResponseWriter for FirstByteRecorder<W> {
    type Conn = W::Conn;

    fn write_status(&mut self, status: StatusCode) {
        self.inner.write_status(status);
        self.mark_first_byte();
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.mark_first_byte();
        self.inner.write(data)
    }

    fn flush(&mut self) -> Result<(), ObserverError> {
        self.inner.flush()
    }

    fn hijack(&mut self) -> Result<Self::Conn, ObserverError> {
        self.inner.hijack()
    }
}

impl<W: TrackedWriter> ObserveResponse for FirstByteRecorder<W> {
    fn status(&self) -> StatusCode {
        self.inner.status()
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn first_byte_time(&self) -> Option<DateTime<Local>> {
        self.first_byte_time
    }
}
