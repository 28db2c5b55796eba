//! `Content-Type` and `Content-Disposition` header values.

use std::collections::HashMap;
use std::fmt;

use crate::encoding::{DecodeMode, decode_rfc2047, decode_rfc2231};
use crate::error::{Error, Result};

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters with lowercased names (e.g., charset=utf-8, boundary=xxx).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// The RFC 2045 default, `text/plain; charset=us-ascii`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "us-ascii")
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present and non-empty.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }

    /// Returns the legacy `name` parameter, decoded.
    #[must_use]
    pub fn name(&self, mode: DecodeMode) -> Option<String> {
        decoded_parameter(&self.parameters, "name", mode)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is `text/plain`.
    #[must_use]
    pub fn is_plain_text(&self) -> bool {
        self.main_type == "text" && self.sub_type == "plain"
    }

    /// Checks if this is `text/html`.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.main_type == "text" && self.sub_type == "html"
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the `type/subtype` pair is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let (type_str, params) = s.split_once(';').unwrap_or((s, ""));

        let (main_type, sub_type) = type_str
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype in {s:?}")))?;

        let main_type = main_type.trim().to_ascii_lowercase();
        let sub_type = sub_type.trim().to_ascii_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidContentType(format!("Empty type in {s:?}")));
        }

        Ok(Self {
            main_type,
            sub_type,
            parameters: parse_parameters(params),
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        let mut params: Vec<_> = self.parameters.iter().collect();
        params.sort();
        for (key, value) in params {
            if value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c)) {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

/// Whether a part is meant to be shown inline or saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionKind {
    /// Displayed as part of the message.
    Inline,
    /// Saved separately.
    Attachment,
    /// Any other disposition token.
    Other(String),
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type.
    pub kind: DispositionKind,
    /// Parameters with lowercased names.
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a disposition value. Never fails; an empty token is `Other("")`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (kind, params) = s.split_once(';').unwrap_or((s, ""));
        let kind = match kind.trim().to_ascii_lowercase().as_str() {
            "inline" => DispositionKind::Inline,
            "attachment" => DispositionKind::Attachment,
            other => DispositionKind::Other(other.to_string()),
        };

        Self {
            kind,
            parameters: parse_parameters(params),
        }
    }

    /// Returns true for `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == DispositionKind::Attachment
    }

    /// Returns the `filename` parameter, preferring the RFC 2231 `filename*` form.
    #[must_use]
    pub fn filename(&self, mode: DecodeMode) -> Option<String> {
        decoded_parameter(&self.parameters, "filename", mode)
    }
}

/// Looks up `name*` (RFC 2231) then `name` (RFC 2047 decoded).
///
/// A value that fails to decode is returned as-is.
fn decoded_parameter(
    parameters: &HashMap<String, String>,
    name: &str,
    mode: DecodeMode,
) -> Option<String> {
    if let Some(extended) = parameters.get(&format!("{name}*")) {
        return Some(decode_rfc2231(extended, mode).unwrap_or_else(|_| extended.clone()));
    }
    parameters
        .get(name)
        .map(|raw| decode_rfc2047(raw, mode).unwrap_or_else(|_| raw.clone()))
        .filter(|value| !value.trim().is_empty())
}

/// Splits `; key=value; key="quoted; value"` into a map.
///
/// Semicolons inside quotes do not split, and backslash escapes inside
/// quotes are resolved.
fn parse_parameters(s: &str) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    let mut segment = String::new();
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in s.chars() {
        if escaped {
            segment.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => {
                in_quotes = !in_quotes;
                segment.push(c);
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut segment)),
            _ => segment.push(c),
        }
    }
    segments.push(segment);

    for segment in segments {
        if let Some((key, value)) = segment.split_once('=') {
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            if !key.is_empty() {
                parameters.insert(key, value.to_string());
            }
        }
    }

    parameters
}
