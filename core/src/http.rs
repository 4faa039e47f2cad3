//! Requests described as plain data.
//!
//! # Design
//! The dispatcher turns each public call into an `HttpRequest` before any
//! backend sees it, so URL assembly, the file-length lookup and the header
//! choice are settled once and are identical for every transport. Fakes in
//! tests receive exactly what a real backend would.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HttpError, Result};

/// Content type sent with `post_file` when the caller supplies none.
pub const DEFAULT_FILE_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Payload of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// Literal POST payload, sent as-is.
    Text(String),
    /// `length` bytes streamed from the file at `path`.
    File { path: PathBuf, length: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// GET `url`, with `query` appended after a single `?` when non-empty.
    pub fn get(url: &str, query: Option<&str>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: effective_url(url, query),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// POST `body` to `url`. The body never touches the URL.
    pub fn post(url: &str, body: &str) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.to_string(),
            headers: Vec::new(),
            body: RequestBody::Text(body.to_string()),
        }
    }

    /// POST the contents of `path`.
    ///
    /// A `length` of zero is replaced by the file's size on disk.
    pub fn post_file(
        url: &str,
        path: impl AsRef<Path>,
        length: u64,
        content_type: Option<&str>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let length = if length == 0 {
            fs::metadata(path)
                .map_err(|source| HttpError::FileNotFound {
                    path: path.to_path_buf(),
                    source,
                })?
                .len()
        } else {
            length
        };
        let content_type = content_type.unwrap_or(DEFAULT_FILE_CONTENT_TYPE);
        Ok(Self {
            method: HttpMethod::Post,
            url: url.to_string(),
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: RequestBody::File {
                path: path.to_path_buf(),
                length,
            },
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// `url` alone, or `url?query` when `query` is present and non-empty.
pub fn effective_url(url: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{url}?{q}"),
        _ => url.to_string(),
    }
}
