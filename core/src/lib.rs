//! Blocking HTTP transport for OAuth requests.
//!
//! # Overview
//! Performs GET and POST requests (and raw file uploads) and returns the
//! server's reply as an in-memory byte buffer. Callers never see which
//! backend did the work: an in-process HTTP client, or an external
//! command-line client such as curl run through the shell.
//!
//! # Design
//! - `HttpClient` is the dispatcher; it owns one `Transport` chosen by
//!   `TransportConfig` at construction.
//! - Every call is first described as an `HttpRequest`, so URL assembly and
//!   file-size detection are shared by both backends.
//! - The command backend parses its template into literal and placeholder
//!   segments before rendering; templates missing `%u` (or `%p` for POST)
//!   fail with `HttpError::Configuration` before anything is spawned.
//! - Replies accumulate in a NUL-terminated `GrowableBuffer`.

pub mod buffer;
pub mod client;
pub mod config;
pub mod error;
pub mod exec;
pub mod http;
pub mod template;
pub mod transport;

/// User agent sent with every request and used by the default commands.
pub const USER_AGENT: &str = concat!("liboauth-agent/", env!("CARGO_PKG_VERSION"));

pub use buffer::GrowableBuffer;
pub use client::HttpClient;
pub use config::{BackendKind, TransportConfig};
pub use error::{HttpError, Result};
pub use exec::{CommandRunner, ShellRunner};
pub use http::{HttpMethod, HttpRequest, RequestBody};
pub use template::{CommandTemplate, Placeholder};
pub use transport::{CommandTransport, LibraryTransport, Transport};
