//! Public request entry points.
//!
//! # Design
//! `HttpClient` owns one `Transport`, chosen from `TransportConfig` at
//! construction, and forwards every call to it. Each call blocks until the
//! reply is complete. The client holds no per-request state, so a shared
//! reference can serve several threads.

use std::path::Path;

use crate::buffer::GrowableBuffer;
use crate::config::{BackendKind, TransportConfig};
use crate::error::{HttpError, Result};
use crate::http::HttpRequest;
use crate::transport::{CommandTransport, LibraryTransport, Transport};

/// Blocking HTTP client used for OAuth requests.
pub struct HttpClient {
    transport: Box<dyn Transport>,
}

impl HttpClient {
    pub fn new(config: &TransportConfig) -> Self {
        let transport: Box<dyn Transport> = match config.backend {
            BackendKind::Library => Box::new(LibraryTransport::new()),
            BackendKind::Command => Box::new(CommandTransport::from_config(config)),
        };
        tracing::debug!(backend = transport.name(), "http client configured");
        Self { transport }
    }

    /// Client configured from the process environment.
    pub fn from_env() -> Self {
        Self::new(&TransportConfig::from_env())
    }

    /// Client using a caller-supplied transport.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.transport.name()
    }

    /// GET `url`, joined with `query` by a single `?` when `query` is
    /// present and non-empty.
    pub fn http_get(&self, url: &str, query: Option<&str>) -> Result<GrowableBuffer> {
        self.transport.execute(&HttpRequest::get(url, query))
    }

    /// POST `body` to `url` as the literal request payload.
    pub fn http_post(&self, url: &str, body: &str) -> Result<GrowableBuffer> {
        self.transport.execute(&HttpRequest::post(url, body))
    }

    /// POST the raw contents of `path` to `url`.
    ///
    /// A `length` of zero means the file's size on disk. `content_type`
    /// defaults to `image/jpeg`. Only the library backend can upload files.
    pub fn post_file(
        &self,
        url: &str,
        path: impl AsRef<Path>,
        length: u64,
        content_type: Option<&str>,
    ) -> Result<GrowableBuffer> {
        if !self.transport.supports_file_upload() {
            tracing::warn!(
                backend = self.transport.name(),
                "post_file requires the library backend"
            );
            return Err(HttpError::UnsupportedOperation(
                "file upload requires the library backend",
            ));
        }
        let request = HttpRequest::post_file(url, path, length, content_type)?;
        self.transport.execute(&request)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("backend", &self.transport.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandRunner;
    use crate::http::{HttpMethod, RequestBody};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Captures requests and answers with a fixed body.
    #[derive(Clone, Default)]
    struct FakeTransport {
        seen: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: &HttpRequest) -> Result<GrowableBuffer> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(GrowableBuffer::from("reply"))
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    /// Counts spawns without running anything.
    #[derive(Clone, Default)]
    struct CountingRunner {
        spawns: Arc<AtomicUsize>,
    }

    impl CommandRunner for CountingRunner {
        fn run(&self, _command: &str) -> Result<GrowableBuffer> {
            self.spawns.fetch_add(1, Ordering::SeqCst);
            Ok(GrowableBuffer::new())
        }
    }

    fn fake_client() -> (HttpClient, Arc<Mutex<Vec<HttpRequest>>>) {
        let fake = FakeTransport::default();
        let seen = fake.seen.clone();
        (HttpClient::with_transport(fake), seen)
    }

    #[test]
    fn http_get_targets_url_and_query() {
        let (client, seen) = fake_client();
        let reply = client.http_get("http://api/x", Some("oauth_token=t")).unwrap();
        assert_eq!(reply.as_bytes(), b"reply");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(seen[0].url, "http://api/x?oauth_token=t");
    }

    #[test]
    fn http_get_without_query_targets_url() {
        let (client, seen) = fake_client();
        client.http_get("http://api/x", None).unwrap();
        client.http_get("http://api/x", Some("")).unwrap();
        let seen = seen.lock().unwrap();
        assert!(seen.iter().all(|r| r.url == "http://api/x"));
    }

    #[test]
    fn http_post_sends_body_as_payload() {
        let (client, seen) = fake_client();
        client.http_post("http://api/token", "a=b").unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(seen[0].url, "http://api/token");
        assert_eq!(seen[0].body, RequestBody::Text("a=b".to_string()));
    }

    #[test]
    fn post_file_declares_size_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let (client, seen) = fake_client();
        client.post_file("http://api/up", file.path(), 0, None).unwrap();
        let seen = seen.lock().unwrap();
        match &seen[0].body {
            RequestBody::File { length, .. } => assert_eq!(*length, 10),
            other => panic!("unexpected body: {other:?}"),
        }
        assert_eq!(seen[0].header("content-type"), Some("image/jpeg"));
    }

    #[test]
    fn post_file_missing_file_never_reaches_transport() {
        let (client, seen) = fake_client();
        let err = client
            .post_file("http://api/up", "/no/such/oauth-http-file", 0, Some("image/png"))
            .unwrap_err();
        assert!(matches!(err, HttpError::FileNotFound { .. }));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn post_file_under_command_backend_is_unsupported() {
        let runner = CountingRunner::default();
        let spawns = runner.spawns.clone();
        let client = HttpClient::with_transport(CommandTransport::with_runner(
            "fetch '%u'",
            "send '%p' '%u'",
            runner,
        ));

        // The file does not exist: the backend check comes first.
        let err = client
            .post_file("http://api/up", "/no/such/oauth-http-file", 0, None)
            .unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedOperation(_)));
        assert_eq!(spawns.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_templates_fail_before_spawning() {
        let runner = CountingRunner::default();
        let spawns = runner.spawns.clone();
        let client =
            HttpClient::with_transport(CommandTransport::with_runner("fetch", "send '%u'", runner));

        assert!(matches!(
            client.http_get("http://api/x", None),
            Err(HttpError::Configuration { .. })
        ));
        assert!(matches!(
            client.http_post("http://api/x", "a=b"),
            Err(HttpError::Configuration { .. })
        ));
        assert_eq!(spawns.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn config_selects_backend() {
        let library = HttpClient::new(&TransportConfig::default());
        assert_eq!(library.backend(), "library");

        let command =
            HttpClient::new(&TransportConfig::default().with_backend(BackendKind::Command));
        assert_eq!(command.backend(), "command");
        assert_eq!(format!("{command:?}"), r#"HttpClient { backend: "command" }"#);
    }

    #[test]
    fn transport_errors_propagate_unchanged() {
        struct Failing;
        impl Transport for Failing {
            fn execute(&self, _: &HttpRequest) -> Result<GrowableBuffer> {
                Err(HttpError::Transport("connection refused".to_string()))
            }
            fn name(&self) -> &'static str {
                "failing"
            }
        }

        let client = HttpClient::with_transport(Failing);
        let err = client.http_get("http://api/x", None).unwrap_err();
        assert_eq!(err.to_string(), "transport failure: connection refused");
    }
}
