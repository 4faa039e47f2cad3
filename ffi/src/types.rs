//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! A reply crosses the boundary as one heap-allocated `FfiHttpReply`: an
//! error code, an optional message, and the reply bytes. The bytes are
//! NUL-terminated so C callers can treat a text reply as a string; `len`
//! excludes the terminator and is authoritative for binary replies.

use std::ffi::CString;
use std::os::raw::c_char;

use oauth_http::{GrowableBuffer, HttpError};

/// Opaque handle to an `HttpClient`. C callers receive a pointer to this
/// and pass it back into every request function.
pub struct FfiHttpClient {
    pub(crate) inner: oauth_http::HttpClient,
}

/// Backend selection for `oauth_http_client_new`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiBackend {
    Library = 0,
    Command = 1,
}

impl From<FfiBackend> for oauth_http::BackendKind {
    fn from(b: FfiBackend) -> Self {
        match b {
            FfiBackend::Library => oauth_http::BackendKind::Library,
            FfiBackend::Command => oauth_http::BackendKind::Command,
        }
    }
}

/// Error codes returned in `FfiHttpReply`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Configuration = 1,
    Transport = 2,
    Subprocess = 3,
    FileNotFound = 4,
    Unsupported = 5,
    Allocation = 6,
    Panic = 7,
    NullArg = 8,
    InvalidUtf8 = 9,
}

impl From<&HttpError> for FfiErrorCode {
    fn from(err: &HttpError) -> Self {
        match err {
            HttpError::Configuration { .. } => FfiErrorCode::Configuration,
            HttpError::Transport(_) => FfiErrorCode::Transport,
            HttpError::Subprocess(_) => FfiErrorCode::Subprocess,
            HttpError::FileNotFound { .. } => FfiErrorCode::FileNotFound,
            HttpError::UnsupportedOperation(_) => FfiErrorCode::Unsupported,
            HttpError::Allocation(_) => FfiErrorCode::Allocation,
        }
    }
}

/// Result envelope for every request function.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to `len` reply bytes followed by a zero byte. An empty reply still
/// has a non-null `data` pointing at the terminator.
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, `data` is null and `len` is zero.
#[repr(C)]
pub struct FfiHttpReply {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub data: *mut u8,
    pub len: usize,
}

impl FfiHttpReply {
    /// Build a success reply, handing the buffer's storage to C.
    pub(crate) fn ok(buffer: GrowableBuffer) -> *mut Self {
        let len = buffer.len();
        let bytes = buffer.into_vec_with_nul().into_boxed_slice();
        let data = Box::into_raw(bytes) as *mut u8;
        Box::into_raw(Box::new(FfiHttpReply {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            data,
            len,
        }))
    }

    /// Build an error reply from an `HttpError`.
    pub(crate) fn from_error(err: HttpError) -> *mut Self {
        Self::failure(FfiErrorCode::from(&err), &err.to_string())
    }

    /// Build an error reply for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, &format!("null argument: {name}"))
    }

    /// Build an error reply for an argument that is not valid UTF-8.
    pub(crate) fn invalid_utf8(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::InvalidUtf8, &format!("argument is not UTF-8: {name}"))
    }

    /// Build an error reply for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, msg)
    }

    fn failure(error_code: FfiErrorCode, msg: &str) -> *mut Self {
        let message = CString::new(msg.replace('\0', " ")).unwrap_or_default();
        Box::into_raw(Box::new(FfiHttpReply {
            error_code,
            error_message: message.into_raw(),
            data: std::ptr::null_mut(),
            len: 0,
        }))
    }
}
