//! Error types for the HTTP transport.
//!
//! # Design
//! One variant per failure category a caller can act on. Configuration
//! problems are kept apart from network problems because they are raised
//! before any I/O happens. Nothing is retried internally.

use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;

/// Errors returned by `HttpClient` and the transports behind it.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// A command template lacks a required placeholder.
    #[error(
        "invalid HTTP command template {template:?}: set the '{variable}' environment variable"
    )]
    Configuration { variable: String, template: String },

    /// The HTTP client could not complete the request.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The command interpreter could not be started.
    #[error("failed to spawn HTTP command: {0}")]
    Subprocess(String),

    /// The file given to `post_file` could not be stat'd or opened.
    #[error("cannot read {}: {source}", .path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The active backend cannot perform the requested operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// A reply buffer could not grow.
    #[error("reply buffer allocation failed: {0}")]
    Allocation(#[source] TryReserveError),
}

pub type Result<T> = std::result::Result<T, HttpError>;
