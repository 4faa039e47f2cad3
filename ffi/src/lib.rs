//! C-ABI wrapper around `oauth-http`.
//!
//! # Overview
//! Exposes `http_get`, `http_post` and `post_file` through `extern "C"`
//! functions so an OAuth library written in C can fetch replies without
//! knowing which backend performs the request.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A client handle is created once (from the environment, or with an
//!   explicit backend and templates) and passed to every request.
//! - Each request returns a single `FfiHttpReply` envelope. The C caller owns
//!   it and must release it with `oauth_http_reply_free`, on success and on
//!   failure alike.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use oauth_http::{HttpClient, TransportConfig};

use types::*;

/// Borrow a C string argument as `&str`.
///
/// Returns `Err` with the ready-made error reply when the pointer is null or
/// the bytes are not UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, *mut FfiHttpReply> {
    if ptr.is_null() {
        return Err(FfiHttpReply::null_arg(name));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FfiHttpReply::invalid_utf8(name))
}

/// Like `arg`, but a null pointer means "not supplied".
///
/// # Safety
/// Same as `arg`.
unsafe fn optional_arg<'a>(
    ptr: *const c_char,
    name: &str,
) -> Result<Option<&'a str>, *mut FfiHttpReply> {
    if ptr.is_null() {
        return Ok(None);
    }
    unsafe { arg(ptr, name) }.map(Some)
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client configured from `OAUTH_HTTP_BACKEND`, `OAUTH_HTTP_GET_CMD`
/// and `OAUTH_HTTP_CMD`.
///
/// Returns null if an internal panic occurs.
/// The caller must free the returned pointer with `oauth_http_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn oauth_http_client_from_env() -> *mut FfiHttpClient {
    catch_unwind(|| {
        let client = HttpClient::from_env();
        Box::into_raw(Box::new(FfiHttpClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a client with an explicit backend.
///
/// `get_command` and `post_command` are the command templates used by the
/// command backend; pass null for the built-in curl commands.
/// Returns null if a template is not valid UTF-8 or if an internal panic
/// occurs.
#[unsafe(no_mangle)]
pub extern "C" fn oauth_http_client_new(
    backend: FfiBackend,
    get_command: *const c_char,
    post_command: *const c_char,
) -> *mut FfiHttpClient {
    catch_unwind(|| {
        let mut config = TransportConfig::default().with_backend(backend.into());
        for (ptr, slot) in [
            (get_command, &mut config.get_command),
            (post_command, &mut config.post_command),
        ] {
            if !ptr.is_null() {
                match unsafe { CStr::from_ptr(ptr) }.to_str() {
                    Ok(s) => *slot = s.to_string(),
                    Err(_) => return std::ptr::null_mut(),
                }
            }
        }
        let client = HttpClient::new(&config);
        Box::into_raw(Box::new(FfiHttpClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `oauth_http_client_*`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn oauth_http_client_free(client: *mut FfiHttpClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// GET `url`, appending `?query` when `query` is non-null and non-empty.
#[unsafe(no_mangle)]
pub extern "C" fn oauth_http_get(
    client: *const FfiHttpClient,
    url: *const c_char,
    query: *const c_char,
) -> *mut FfiHttpReply {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiHttpReply::null_arg("client");
        }
        let client = unsafe { &*client };
        let url = match unsafe { arg(url, "url") } {
            Ok(u) => u,
            Err(reply) => return reply,
        };
        let query = match unsafe { optional_arg(query, "query") } {
            Ok(q) => q,
            Err(reply) => return reply,
        };
        match client.inner.http_get(url, query) {
            Ok(buffer) => FfiHttpReply::ok(buffer),
            Err(e) => FfiHttpReply::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panicked("oauth_http_get"))
}

/// POST `body` to `url`.
#[unsafe(no_mangle)]
pub extern "C" fn oauth_http_post(
    client: *const FfiHttpClient,
    url: *const c_char,
    body: *const c_char,
) -> *mut FfiHttpReply {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiHttpReply::null_arg("client");
        }
        let client = unsafe { &*client };
        let url = match unsafe { arg(url, "url") } {
            Ok(u) => u,
            Err(reply) => return reply,
        };
        let body = match unsafe { arg(body, "body") } {
            Ok(b) => b,
            Err(reply) => return reply,
        };
        match client.inner.http_post(url, body) {
            Ok(buffer) => FfiHttpReply::ok(buffer),
            Err(e) => FfiHttpReply::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panicked("oauth_http_post"))
}

/// POST the raw contents of the file at `path` to `url`.
///
/// `len` is a byte count (`size_t`); zero means the file's size on disk. `content_type` may be null
/// for `image/jpeg`. Fails with `Unsupported` under the command backend.
#[unsafe(no_mangle)]
pub extern "C" fn oauth_post_file(
    client: *const FfiHttpClient,
    url: *const c_char,
    path: *const c_char,
    len: usize,
    content_type: *const c_char,
) -> *mut FfiHttpReply {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiHttpReply::null_arg("client");
        }
        let client = unsafe { &*client };
        let url = match unsafe { arg(url, "url") } {
            Ok(u) => u,
            Err(reply) => return reply,
        };
        let path = match unsafe { arg(path, "path") } {
            Ok(p) => p,
            Err(reply) => return reply,
        };
        let content_type = match unsafe { optional_arg(content_type, "content_type") } {
            Ok(c) => c,
            Err(reply) => return reply,
        };
        match client.inner.post_file(url, path, len as u64, content_type) {
            Ok(buffer) => FfiHttpReply::ok(buffer),
            Err(e) => FfiHttpReply::from_error(e),
        }
    }))
    .unwrap_or_else(|_| panicked("oauth_post_file"))
}

fn panicked(function: &str) -> *mut FfiHttpReply {
    tracing::error!(function, "panic caught at FFI boundary");
    FfiHttpReply::panic(&format!("panic in {function}"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpReply` returned by any request function, including its
/// data and message. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn oauth_http_reply_free(reply: *mut FfiHttpReply) {
    if reply.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let reply = unsafe { Box::from_raw(reply) };
        if !reply.error_message.is_null() {
            drop(unsafe { CString::from_raw(reply.error_message) });
        }
        if !reply.data.is_null() {
            let bytes = std::ptr::slice_from_raw_parts_mut(reply.data, reply.len + 1);
            drop(unsafe { Box::from_raw(bytes) });
        }
    });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
