//! Transport configuration.
//!
//! # Design
//! The environment is read in exactly one place, `TransportConfig::from_env`,
//! and the result is handed to `HttpClient::new`. Transports never consult
//! the environment themselves, so tests can configure them directly.

use serde::{Deserialize, Serialize};

use crate::USER_AGENT;

/// Environment variable overriding the POST command template.
pub const POST_COMMAND_VAR: &str = "OAUTH_HTTP_CMD";

/// Environment variable overriding the GET command template.
pub const GET_COMMAND_VAR: &str = "OAUTH_HTTP_GET_CMD";

/// Environment variable selecting the backend (`library` or `command`).
pub const BACKEND_VAR: &str = "OAUTH_HTTP_BACKEND";

/// Built-in POST command. `%p` is the payload, `%u` the URL.
pub fn default_post_command() -> String {
    format!("curl -sA '{USER_AGENT}' -d '%p' '%u' ")
}

/// Built-in GET command. `%u` is the URL including any query string.
pub fn default_get_command() -> String {
    format!("curl -sA '{USER_AGENT}' '%u' ")
}

/// Which transport performs requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process HTTP client.
    #[default]
    Library,
    /// External command-line client run through the shell.
    Command,
}

impl BackendKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "library" | "lib" | "ureq" => Some(BackendKind::Library),
            "command" | "cmd" | "shell" => Some(BackendKind::Command),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_get_command")]
    pub get_command: String,
    #[serde(default = "default_post_command")]
    pub post_command: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            get_command: default_get_command(),
            post_command: default_post_command(),
        }
    }
}

impl TransportConfig {
    /// Configuration taken from `OAUTH_HTTP_BACKEND`, `OAUTH_HTTP_GET_CMD`
    /// and `OAUTH_HTTP_CMD`, with built-in defaults for unset variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = lookup(BACKEND_VAR) {
            match BackendKind::parse(&value) {
                Some(kind) => config.backend = kind,
                None => tracing::warn!(
                    variable = BACKEND_VAR,
                    value = %value,
                    "unknown backend, using the default"
                ),
            }
        }
        if let Some(command) = lookup(GET_COMMAND_VAR) {
            config.get_command = command;
        }
        if let Some(command) = lookup(POST_COMMAND_VAR) {
            config.post_command = command;
        }
        config
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }
}
