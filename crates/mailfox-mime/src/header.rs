//! Message and part headers.

use std::fmt;

use crate::encoding::{DecodeMode, decode_rfc2047, decode_utf8};

/// Ordered collection of headers.
///
/// Names are matched case-insensitively; insertion order is preserved so
/// that repeated headers come back in the order the message carried them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Gets the first value with RFC 2047 encoded words decoded.
    ///
    /// If decoding fails the raw value is returned instead.
    #[must_use]
    pub fn get_decoded(&self, name: &str, mode: DecodeMode) -> Option<String> {
        self.get(name)
            .map(|raw| decode_rfc2047(raw, mode).unwrap_or_else(|_| raw.to_string()))
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all headers in message order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses a raw header block.
    ///
    /// Folded lines are joined with a single space. Lines without a colon
    /// are ignored. Raw 8-bit bytes are decoded as UTF-8 with invalid
    /// sequences dropped.
    #[must_use]
    pub fn parse(block: &[u8]) -> Self {
        let text = decode_utf8(block, DecodeMode::Lossy).unwrap_or_default();
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }

            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim();
                if !name.is_empty() {
                    current = Some((name.to_string(), value.trim().to_string()));
                }
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        headers
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// Splits a raw entity into its header block and body at the first blank line.
///
/// An entity that starts with a blank line has no headers. An entity with no
/// blank line at all is all headers and an empty body.
#[must_use]
pub fn split_header_body(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.starts_with(b"\r\n") {
        return (&[][..], &raw[2..]);
    }
    if raw.starts_with(b"\n") {
        return (&[][..], &raw[1..]);
    }

    let crlf = find(raw, b"\r\n\r\n").map(|i| (i, 4));
    let lf = find(raw, b"\n\n").map(|i| (i, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    split.map_or((raw, &[][..]), |(i, len)| (&raw[..i], &raw[i + len..]))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_get_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn test_headers_keep_order() {
        let mut headers = Headers::new();
        headers.add("Received", "first");
        headers.add("Subject", "x");
        headers.add("Received", "second");
        assert_eq!(headers.get_all("received"), vec!["first", "second"]);
    }

    #[test]
    fn test_headers_parse_folded() {
        let block = concat!(
            "From: sender@example.com\r\n",
            "Subject: A very\r\n",
            "\tlong subject\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
        );

        let headers = Headers::parse(block.as_bytes());
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("Subject"), Some("A very long subject"));
        assert_eq!(headers.get("Content-Type"), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_headers_parse_skips_garbage_lines() {
        let headers = Headers::parse(b"not a header\nSubject: ok\n");
        assert_eq!(headers.iter().count(), 1);
        assert_eq!(headers.get("subject"), Some("ok"));
    }

    #[test]
    fn test_get_decoded_falls_back_to_raw() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?B?!!!?=");
        assert_eq!(
            headers.get_decoded("subject", DecodeMode::Lossy).as_deref(),
            Some("=?utf-8?B?!!!?=")
        );
    }

    #[test]
    fn test_split_header_body() {
        let (h, b) = split_header_body(b"A: 1\r\nB: 2\r\n\r\nbody\r\n");
        assert_eq!(h, b"A: 1\r\nB: 2");
        assert_eq!(b, b"body\r\n");

        let (h, b) = split_header_body(b"A: 1\n\nbody");
        assert_eq!(h, b"A: 1");
        assert_eq!(b, b"body");

        let (h, b) = split_header_body(b"\r\nonly body");
        assert!(h.is_empty());
        assert_eq!(b, b"only body");

        let (h, b) = split_header_body(b"A: 1");
        assert_eq!(h, b"A: 1");
        assert!(b.is_empty());
    }
}
