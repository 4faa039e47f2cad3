//! Command templates for the command-line backend.
//!
//! # Design
//! A template such as `curl -s -d '%p' '%u'` is parsed once into an ordered
//! list of literal segments and typed placeholders. Rendering is a separate
//! pure step, so the order in which the user wrote `%u` and `%p` is recorded
//! by the parse rather than assumed by the renderer.
//!
//! Only the first occurrence of each *required* token becomes a placeholder.
//! Every other `%` sequence is literal text and is copied through verbatim.

use crate::error::{HttpError, Result};

/// A runtime value substituted into a command template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `%u`: the effective request URL.
    Url,
    /// `%p`: the POST payload.
    Payload,
}

impl Placeholder {
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::Url => "%u",
            Placeholder::Payload => "%p",
        }
    }
}

/// Placeholders a GET template must contain.
pub const GET_PLACEHOLDERS: &[Placeholder] = &[Placeholder::Url];

/// Placeholders a POST template must contain.
pub const POST_PLACEHOLDERS: &[Placeholder] = &[Placeholder::Url, Placeholder::Payload];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// A parsed command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    segments: Vec<Segment>,
}

impl CommandTemplate {
    /// Parse `raw`, requiring each of `required` to occur at least once.
    ///
    /// `variable` names the environment variable the template is configured
    /// through; it only appears in the error.
    pub fn parse(raw: &str, required: &[Placeholder], variable: &str) -> Result<Self> {
        let mut found = Vec::with_capacity(required.len());
        for &placeholder in required {
            match raw.find(placeholder.token()) {
                Some(pos) => found.push((pos, placeholder)),
                None => {
                    tracing::warn!(
                        variable,
                        missing = placeholder.token(),
                        "invalid HTTP command template"
                    );
                    return Err(HttpError::Configuration {
                        variable: variable.to_string(),
                        template: raw.to_string(),
                    });
                }
            }
        }
        found.sort_by_key(|&(pos, _)| pos);

        let mut segments = Vec::with_capacity(found.len() * 2 + 1);
        let mut cursor = 0;
        for (pos, placeholder) in found {
            if pos > cursor {
                segments.push(Segment::Literal(raw[cursor..pos].to_string()));
            }
            segments.push(Segment::Placeholder(placeholder));
            cursor = pos + placeholder.token().len();
        }
        if cursor < raw.len() {
            segments.push(Segment::Literal(raw[cursor..].to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholders in the order they appear, left to right.
    pub fn placeholder_order(&self) -> Vec<Placeholder> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(p) => Some(*p),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Substitute `url` and `payload` into the template.
    pub fn render(&self, url: &str, payload: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(Placeholder::Url) => out.push_str(url),
                Segment::Placeholder(Placeholder::Payload) => out.push_str(payload),
            }
        }
        out
    }
}
