//! The two interchangeable backends.
//!
//! # Design
//! `Transport` is the single capability the dispatcher needs: perform one
//! blocking request and hand back the whole reply. `LibraryTransport` links
//! an HTTP client (ureq) and streams the reply body into a `GrowableBuffer`.
//! `CommandTransport` renders a command template and runs it through a
//! `CommandRunner`.
//!
//! Every resource a request opens (agent connection, file handle, pipe,
//! child process) is owned by a local and released when the call returns,
//! on success and error paths alike.

use std::fs::File;
use std::io::{self, Read};

use ureq::typestate::WithBody;
use ureq::{Agent, RequestBuilder, SendBody};

use crate::buffer::{read_chunks, GrowableBuffer};
use crate::config::{TransportConfig, GET_COMMAND_VAR, POST_COMMAND_VAR};
use crate::error::{HttpError, Result};
use crate::exec::{CommandRunner, ShellRunner};
use crate::http::{HttpMethod, HttpRequest, RequestBody};
use crate::template::{CommandTemplate, GET_PLACEHOLDERS, POST_PLACEHOLDERS};
use crate::USER_AGENT;

/// Content type for literal POST payloads, as curl's `-d` sends them.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Performs one request and returns the reply body.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<GrowableBuffer>;

    /// Whether `RequestBody::File` requests can be performed.
    fn supports_file_upload(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &HttpRequest) -> Result<GrowableBuffer> {
        (**self).execute(request)
    }

    fn supports_file_upload(&self) -> bool {
        (**self).supports_file_upload()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

// ---------------------------------------------------------------------------
// Library-backed transport
// ---------------------------------------------------------------------------

/// Performs requests with an in-process ureq agent.
///
/// HTTP error statuses are not treated as failures: the reply body is
/// returned whatever the status, the way curl behaves without `--fail`.
/// Redirects are not followed either; a 3xx reply's own body is returned,
/// so a POST is never replayed as a bodiless GET against the new location.
#[derive(Clone)]
pub struct LibraryTransport {
    agent: Agent,
}

impl LibraryTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    fn post_builder(&self, request: &HttpRequest) -> RequestBuilder<WithBody> {
        let mut builder = self.agent.post(&request.url).header("User-Agent", USER_AGENT);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }
}

impl std::fmt::Debug for LibraryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryTransport").finish_non_exhaustive()
    }
}

impl Default for LibraryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LibraryTransport {
    fn execute(&self, request: &HttpRequest) -> Result<GrowableBuffer> {
        tracing::debug!(method = ?request.method, url = %request.url, "sending request");
        let sent = match (request.method, &request.body) {
            (HttpMethod::Get, _) => {
                let mut builder = self.agent.get(&request.url).header("User-Agent", USER_AGENT);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            (HttpMethod::Post, RequestBody::Empty) => self.post_builder(request).send_empty(),
            (HttpMethod::Post, RequestBody::Text(body)) => {
                let builder = self.post_builder(request);
                let builder = if request.header("content-type").is_none() {
                    builder.content_type(FORM_CONTENT_TYPE)
                } else {
                    builder
                };
                builder.send(body.as_bytes())
            }
            (HttpMethod::Post, RequestBody::File { path, length }) => {
                let not_found = |source| HttpError::FileNotFound {
                    path: path.clone(),
                    source,
                };
                let file = File::open(path).map_err(not_found)?;
                // Content-Length is a promise; a short file would stall the peer.
                let available = file.metadata().map_err(not_found)?.len();
                if available < *length {
                    tracing::warn!(
                        path = %path.display(),
                        available,
                        length = *length,
                        "upload file too short"
                    );
                    return Err(not_found(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("file has {available} bytes, {length} declared"),
                    )));
                }
                let mut reader = file.take(*length);
                self.post_builder(request)
                    .header("Content-Length", length.to_string())
                    .send(SendBody::from_reader(&mut reader))
            }
        };

        let mut response = sent.map_err(|e| HttpError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, url = %request.url, "non-success status");
        }
        let reader = response.body_mut().as_reader();
        read_chunks(reader, |e| HttpError::Transport(format!("reading reply: {e}")))
    }

    fn name(&self) -> &'static str {
        "library"
    }
}

// ---------------------------------------------------------------------------
// Command-line transport
// ---------------------------------------------------------------------------

/// Performs requests by running a command-line HTTP client.
///
/// Templates are parsed on every request, so a broken template surfaces as
/// `HttpError::Configuration` on the call that uses it and nothing is spawned.
#[derive(Debug, Clone)]
pub struct CommandTransport<R = ShellRunner> {
    get_command: String,
    post_command: String,
    runner: R,
}

impl CommandTransport<ShellRunner> {
    pub fn new(get_command: &str, post_command: &str) -> Self {
        Self::with_runner(get_command, post_command, ShellRunner::new())
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(&config.get_command, &config.post_command)
    }
}

impl<R: CommandRunner> CommandTransport<R> {
    pub fn with_runner(get_command: &str, post_command: &str, runner: R) -> Self {
        Self {
            get_command: get_command.to_string(),
            post_command: post_command.to_string(),
            runner,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// The command line that would be run for `request`.
    pub fn render(&self, request: &HttpRequest) -> Result<String> {
        match (request.method, &request.body) {
            (_, RequestBody::File { .. }) => Err(HttpError::UnsupportedOperation(
                "file upload requires the library backend",
            )),
            (HttpMethod::Get, _) => {
                let template =
                    CommandTemplate::parse(&self.get_command, GET_PLACEHOLDERS, GET_COMMAND_VAR)?;
                Ok(template.render(&request.url, ""))
            }
            (HttpMethod::Post, body) => {
                let payload = match body {
                    RequestBody::Text(text) => text.as_str(),
                    _ => "",
                };
                let template = CommandTemplate::parse(
                    &self.post_command,
                    POST_PLACEHOLDERS,
                    POST_COMMAND_VAR,
                )?;
                Ok(template.render(&request.url, payload))
            }
        }
    }
}

impl<R: CommandRunner> Transport for CommandTransport<R> {
    fn execute(&self, request: &HttpRequest) -> Result<GrowableBuffer> {
        let command = self.render(request)?;
        self.runner.run(&command)
    }

    fn supports_file_upload(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Records every command instead of running it.
    #[derive(Default)]
    struct SpyRunner {
        commands: Mutex<Vec<String>>,
    }

    impl SpyRunner {
        fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl CommandRunner for SpyRunner {
        fn run(&self, command: &str) -> Result<GrowableBuffer> {
            self.commands.lock().unwrap().push(command.to_string());
            Ok(GrowableBuffer::from("ok"))
        }
    }

    fn spy(get: &str, post: &str) -> CommandTransport<SpyRunner> {
        CommandTransport::with_runner(get, post, SpyRunner::default())
    }

    #[test]
    fn get_renders_url_with_query() {
        let t = spy("fetch '%u'", "send '%p' '%u'");
        let out = t.execute(&HttpRequest::get("http://h/r", Some("a=1"))).unwrap();
        assert_eq!(out.as_bytes(), b"ok");
        assert_eq!(t.runner().commands(), vec!["fetch 'http://h/r?a=1'"]);
    }

    #[test]
    fn post_payload_first_template() {
        let t = spy("fetch '%u'", "send -d '%p' '%u'");
        t.execute(&HttpRequest::post("http://h/t", "x=1")).unwrap();
        assert_eq!(t.runner().commands(), vec!["send -d 'x=1' 'http://h/t'"]);
    }

    #[test]
    fn post_url_first_template() {
        let t = spy("fetch '%u'", "send '%u' --data '%p'");
        t.execute(&HttpRequest::post("http://h/t", "x=1")).unwrap();
        assert_eq!(t.runner().commands(), vec!["send 'http://h/t' --data 'x=1'"]);
    }

    #[test]
    fn post_template_without_payload_never_spawns() {
        let t = spy("fetch '%u'", "send '%u'");
        let err = t.execute(&HttpRequest::post("http://h/t", "x=1")).unwrap_err();
        assert!(matches!(
            err,
            HttpError::Configuration { ref variable, .. } if variable == POST_COMMAND_VAR
        ));
        assert!(t.runner().commands().is_empty());
    }

    #[test]
    fn get_template_without_url_never_spawns() {
        let t = spy("fetch", "send '%p' '%u'");
        let err = t.execute(&HttpRequest::get("http://h/r", None)).unwrap_err();
        assert!(matches!(
            err,
            HttpError::Configuration { ref variable, .. } if variable == GET_COMMAND_VAR
        ));
        assert!(t.runner().commands().is_empty());
    }

    #[test]
    fn get_ignores_broken_post_template() {
        let t = spy("fetch '%u'", "broken");
        assert!(t.execute(&HttpRequest::get("http://h/r", None)).is_ok());
    }

    #[test]
    fn file_requests_are_unsupported() {
        let t = spy("fetch '%u'", "send '%p' '%u'");
        let req = HttpRequest::post_file("http://h/up", "/x", 3, None).unwrap();
        let err = t.execute(&req).unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedOperation(_)));
        assert!(!t.supports_file_upload());
        assert!(t.runner().commands().is_empty());
    }

    #[test]
    fn library_transport_supports_file_upload() {
        assert!(LibraryTransport::new().supports_file_upload());
        assert_eq!(LibraryTransport::new().name(), "library");
    }

    #[test]
    fn library_transport_reports_connection_failure() {
        // Port 9 (discard) on localhost is essentially never listening.
        let err = LibraryTransport::new()
            .execute(&HttpRequest::get("http://127.0.0.1:9/", None))
            .unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
    }

    #[test]
    fn library_transport_rejects_malformed_url() {
        let err = LibraryTransport::new()
            .execute(&HttpRequest::get("not a url", None))
            .unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
    }

    #[test]
    fn library_transport_missing_upload_file() {
        let req =
            HttpRequest::post_file("http://127.0.0.1:9/", "/no/such/oauth-http-file", 5, None)
                .unwrap();
        let err = LibraryTransport::new().execute(&req).unwrap_err();
        assert!(matches!(err, HttpError::FileNotFound { .. }));
    }

    #[test]
    fn library_transport_rejects_length_beyond_file_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"short").unwrap();
        file.flush().unwrap();

        // Nothing listens on the port: the check must fail before connecting.
        let req = HttpRequest::post_file("http://127.0.0.1:9/", file.path(), 100, None).unwrap();
        let err = LibraryTransport::new().execute(&req).unwrap_err();
        match err {
            HttpError::FileNotFound { path, source } => {
                assert_eq!(path, file.path());
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
