//! Echo server for exercising the HTTP transports end to end.
//!
//! `/echo` answers GET and POST with a JSON `Echo` describing the request
//! it received. The other routes produce awkward replies: an empty body, an
//! arbitrary status, a redirect to `/echo`, or a body large enough to span
//! many reads.

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Largest body `/bytes/{n}` will produce.
pub const MAX_GENERATED_BYTES: usize = 1 << 20;

/// What the server saw of a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    /// Path and query exactly as received.
    pub uri: String,
    pub user_agent: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", get(echo).post(echo))
        .route("/empty", get(empty))
        .route("/redirect", get(redirect).post(redirect))
        .route("/status/{code}", get(status))
        .route("/bytes/{n}", get(generated))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    tracing::info!(%method, %uri, bytes = body.len(), "echo");
    Json(Echo {
        method: method.to_string(),
        uri: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        user_agent: header_str(&headers, header::USER_AGENT),
        content_type: header_str(&headers, header::CONTENT_TYPE),
        content_length: header_str(&headers, header::CONTENT_LENGTH).and_then(|v| v.parse().ok()),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

/// Body of every `/redirect` reply.
pub const REDIRECT_BODY: &str = "redirect-body";

async fn redirect() -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
    (StatusCode::FOUND, [(header::LOCATION, "/echo")], REDIRECT_BODY)
}

async fn status(Path(code): Path<u16>) -> (StatusCode, String) {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")),
        Err(_) => (StatusCode::BAD_REQUEST, format!("invalid status {code}")),
    }
}

async fn generated(Path(n): Path<usize>) -> Result<Vec<u8>, StatusCode> {
    if n > MAX_GENERATED_BYTES {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }
    Ok((0..n).map(|i| b'a' + (i % 26) as u8).collect())
}
