//! Network helpers.
//!
//! # Responsibilities
//! - Resolve the server's own IP once, at logger construction
//!
//! # Design Decisions
//! - Resolution failure is fatal to logger construction, never per request

pub mod local_addr;

pub use local_addr::local_ip;
