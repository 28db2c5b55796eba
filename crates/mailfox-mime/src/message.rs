//! MIME part tree.
//!
//! A message is parsed into a tree of [`Part`]s: leaves carry a decoded
//! payload, containers carry their children. Parsing never fails; whatever
//! cannot be understood degrades to a `text/plain` leaf.

use std::fmt;

use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{DecodeMode, decode_base64, decode_charset, decode_quoted_printable};
use crate::header::{Headers, split_header_body};

/// Nesting limit for multipart containers.
const MAX_DEPTH: usize = 32;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }

    /// Decodes a body. Invalid Base64 leaves the body as it was.
    #[must_use]
    pub fn decode(self, body: &[u8]) -> Vec<u8> {
        match self {
            Self::Base64 => decode_base64(body).unwrap_or_else(|_| body.to_vec()),
            Self::QuotedPrintable => decode_quoted_printable(body),
            Self::SevenBit | Self::EightBit | Self::Binary => body.to_vec(),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Coarse classification of a leaf's content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// `text/plain`.
    PlainText,
    /// `text/html`.
    Html,
    /// Anything else.
    Other,
}

/// A leaf part with its transfer encoding already removed.
#[derive(Debug, Clone)]
pub struct Leaf {
    /// Part headers.
    pub headers: Headers,
    /// Content type, defaulted to `text/plain` when absent or malformed.
    pub content_type: ContentType,
    /// Content disposition, if the part declared one.
    pub disposition: Option<ContentDisposition>,
    /// Decoded payload bytes.
    pub body: Vec<u8>,
}

impl Leaf {
    /// Classifies the content type.
    #[must_use]
    pub fn kind(&self) -> PartKind {
        if self.content_type.is_plain_text() {
            PartKind::PlainText
        } else if self.content_type.is_html() {
            PartKind::Html
        } else {
            PartKind::Other
        }
    }

    /// Returns true if the disposition is `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.disposition
            .as_ref()
            .is_some_and(ContentDisposition::is_attachment)
    }

    /// Returns the filename from the disposition, falling back to the
    /// content type's `name` parameter. Blank names count as absent.
    #[must_use]
    pub fn filename(&self, mode: DecodeMode) -> Option<String> {
        let present = |name: &String| !name.trim().is_empty();
        self.disposition
            .as_ref()
            .and_then(|d| d.filename(mode))
            .filter(present)
            .or_else(|| self.content_type.name(mode).filter(present))
    }

    /// Returns the `Content-ID` header without angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.headers
            .get("content-id")
            .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>'))
            .filter(|id| !id.is_empty())
    }

    /// Decodes the payload as text using the declared charset.
    #[must_use]
    pub fn text(&self, mode: DecodeMode) -> String {
        let charset = self.content_type.charset().unwrap_or("utf-8");
        decode_charset(&self.body, charset, mode).unwrap_or_else(|_| {
            decode_charset(&self.body, charset, DecodeMode::Lossy).unwrap_or_default()
        })
    }
}

/// A multipart container.
#[derive(Debug, Clone)]
pub struct Multipart {
    /// Container headers.
    pub headers: Headers,
    /// Container content type (`multipart/*`).
    pub content_type: ContentType,
    /// Child parts in message order.
    pub parts: Vec<Part>,
}

/// One node of the part tree.
#[derive(Debug, Clone)]
pub enum Part {
    /// A payload-carrying part.
    Leaf(Leaf),
    /// A container of further parts.
    Multipart(Multipart),
}

impl Part {
    /// Parses a raw entity (headers, blank line, body).
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        Self::parse_at_depth(raw, 0)
    }

    fn parse_at_depth(raw: &[u8], depth: usize) -> Self {
        let entity = Entity::read(raw);
        match entity.children() {
            Some(children) if depth < MAX_DEPTH => {
                let parts = children
                    .into_iter()
                    .map(|child| Self::parse_at_depth(child, depth + 1))
                    .collect();
                Self::Multipart(entity.into_multipart(parts))
            }
            Some(children) => Self::Multipart(entity.into_multipart(flatten(children))),
            None => Self::Leaf(entity.into_leaf()),
        }
    }

    /// Returns the part's headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        match self {
            Self::Leaf(leaf) => &leaf.headers,
            Self::Multipart(multipart) => &multipart.headers,
        }
    }

    /// Returns the part's content type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        match self {
            Self::Leaf(leaf) => &leaf.content_type,
            Self::Multipart(multipart) => &multipart.content_type,
        }
    }

    /// Iterates over all leaves depth-first, in message order.
    #[must_use]
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }
}

/// Depth-first iterator over the leaves of a part tree.
#[derive(Debug)]
pub struct Leaves<'a> {
    stack: Vec<&'a Part>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Leaf;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(part) = self.stack.pop() {
            match part {
                Part::Leaf(leaf) => return Some(leaf),
                Part::Multipart(multipart) => self.stack.extend(multipart.parts.iter().rev()),
            }
        }
        None
    }
}

/// A parsed message: the root part of the tree.
#[derive(Debug, Clone)]
pub struct Message {
    /// Root part; its headers are the message headers.
    pub root: Part,
}

impl Message {
    /// Parses raw message bytes. Never fails.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        Self {
            root: Part::parse(raw),
        }
    }

    /// Returns the top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        self.root.headers()
    }

    /// Iterates over all leaves depth-first.
    #[must_use]
    pub fn leaves(&self) -> Leaves<'_> {
        self.root.leaves()
    }

    /// Returns the first leaf, in walk order, that matches `predicate`.
    pub fn find_leaf<P>(&self, mut predicate: P) -> Option<&Leaf>
    where
        P: FnMut(&Leaf) -> bool,
    {
        self.leaves().find(|leaf| predicate(leaf))
    }

    /// Returns true if the root is a multipart container.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.root, Part::Multipart(_))
    }
}

/// Headers and undecoded body of one entity, before it becomes a node.
struct Entity<'a> {
    headers: Headers,
    content_type: ContentType,
    body: &'a [u8],
}

impl<'a> Entity<'a> {
    fn read(raw: &'a [u8]) -> Self {
        let (header_block, body) = split_header_body(raw);
        let headers = Headers::parse(header_block);
        let content_type = headers
            .get("content-type")
            .and_then(|value| ContentType::parse(value).ok())
            .unwrap_or_else(ContentType::text_plain);
        Self {
            headers,
            content_type,
            body,
        }
    }

    /// Raw child entities, or `None` unless this is a multipart whose
    /// boundary actually delimits at least one part.
    fn children(&self) -> Option<Vec<&'a [u8]>> {
        if !self.content_type.is_multipart() {
            return None;
        }
        let parts = split_multipart(self.body, self.content_type.boundary()?);
        (!parts.is_empty()).then_some(parts)
    }

    fn into_multipart(self, parts: Vec<Part>) -> Multipart {
        Multipart {
            headers: self.headers,
            content_type: self.content_type,
            parts,
        }
    }

    /// A multipart that cannot be split keeps its whole body as plain text.
    fn into_leaf(self) -> Leaf {
        let content_type = if self.content_type.is_multipart() {
            ContentType::text_plain()
        } else {
            self.content_type
        };
        let disposition = self
            .headers
            .get("content-disposition")
            .map(ContentDisposition::parse);
        let body = self
            .headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
            .decode(self.body);

        Leaf {
            headers: self.headers,
            content_type,
            disposition,
            body,
        }
    }
}

/// Parses entities nested past [`MAX_DEPTH`] without recursing, lifting
/// every leaf into one flat list in message order.
fn flatten(children: Vec<&[u8]>) -> Vec<Part> {
    let mut leaves = Vec::new();
    let mut pending: Vec<&[u8]> = children.into_iter().rev().collect();

    while let Some(raw) = pending.pop() {
        let entity = Entity::read(raw);
        match entity.children() {
            Some(nested) => pending.extend(nested.into_iter().rev()),
            None => leaves.push(Part::Leaf(entity.into_leaf())),
        }
    }

    leaves
}

/// Splits a multipart body on `--boundary` delimiter lines.
///
/// The preamble and epilogue are discarded. A body whose closing delimiter
/// is missing keeps the last part up to the end of the input.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let open = format!("--{boundary}");
    let close = format!("--{boundary}--");
    let mut parts = Vec::new();
    let mut current: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive(|&b| b == b'\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = trim_line_end(line);

        let is_close = trimmed == close.as_bytes();
        if is_close || trimmed == open.as_bytes() {
            if let Some(start) = current.take() {
                parts.push(strip_trailing_newline(&body[start..line_start]));
            }
            if is_close {
                return parts;
            }
            current = Some(offset);
        }
    }

    if let Some(start) = current {
        parts.push(&body[start..]);
    }
    parts
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b'\n' | b' ' | b'\t'))
        .map_or(0, |i| i + 1);
    &line[..end]
}

fn strip_trailing_newline(part: &[u8]) -> &[u8] {
    part.strip_suffix(b"\r\n")
        .or_else(|| part.strip_suffix(b"\n"))
        .unwrap_or(part)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NESTED: &str = concat!(
        "From: a@example.com\r\n",
        "Content-Type: multipart/mixed; boundary=\"outer\"\r\n",
        "\r\n",
        "preamble\r\n",
        "--outer\r\n",
        "Content-Type: multipart/alternative; boundary=inner\r\n",
        "\r\n",
        "--inner\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "\r\n",
        "plain body\r\n",
        "--inner\r\n",
        "Content-Type: text/html\r\n",
        "\r\n",
        "<p>html body</p>\r\n",
        "--inner--\r\n",
        "--outer\r\n",
        "Content-Type: application/pdf; name=doc.pdf\r\n",
        "Content-Disposition: attachment; filename=doc.pdf\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "JVBERi0=\r\n",
        "--outer--\r\n",
        "epilogue\r\n",
    );

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" BASE64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_single_part_defaults_to_plain_text() {
        let message = Message::parse(b"Subject: hi\r\n\r\nHello");
        assert!(!message.is_multipart());
        let leaf = message.leaves().next().unwrap();
        assert_eq!(leaf.kind(), PartKind::PlainText);
        assert_eq!(leaf.body, b"Hello");
    }

    #[test]
    fn test_nested_multipart_walk_order() {
        let message = Message::parse(NESTED.as_bytes());
        assert!(message.is_multipart());

        let kinds: Vec<_> = message.leaves().map(Leaf::kind).collect();
        assert_eq!(kinds, vec![PartKind::PlainText, PartKind::Html, PartKind::Other]);

        let leaves: Vec<_> = message.leaves().collect();
        assert_eq!(leaves[0].body, b"plain body");
        assert_eq!(leaves[1].body, b"<p>html body</p>");
        assert_eq!(leaves[2].body, b"%PDF-");
        assert!(leaves[2].is_attachment());
        assert_eq!(leaves[2].filename(DecodeMode::Lossy).as_deref(), Some("doc.pdf"));
    }

    #[test]
    fn test_find_leaf_with_predicate() {
        let message = Message::parse(NESTED.as_bytes());
        let html = message.find_leaf(|leaf| leaf.kind() == PartKind::Html).unwrap();
        assert_eq!(html.text(DecodeMode::Lossy), "<p>html body</p>");
        assert!(message.find_leaf(|leaf| leaf.content_id().is_some()).is_none());
    }

    #[test]
    fn test_multipart_without_boundary_is_a_leaf() {
        let message = Message::parse(b"Content-Type: multipart/mixed\r\n\r\nbody");
        match &message.root {
            Part::Leaf(leaf) => assert_eq!(leaf.body, b"body"),
            Part::Multipart(_) => panic!("expected leaf"),
        }
    }

    #[test]
    fn test_unused_boundary_keeps_body_as_text() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=declared\r\n",
            "\r\n",
            "--actual\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "hello\r\n",
            "--actual\r\n",
            "Content-Type: application/pdf\r\n",
            "Content-Disposition: attachment; filename=a.pdf\r\n",
            "\r\n",
            "pdf\r\n",
            "--actual--\r\n",
        );
        let message = Message::parse(raw.as_bytes());
        match &message.root {
            Part::Leaf(leaf) => {
                assert_eq!(leaf.kind(), PartKind::PlainText);
                let text = leaf.text(DecodeMode::Lossy);
                assert!(text.contains("hello"));
                assert!(text.contains("filename=a.pdf"));
            }
            Part::Multipart(_) => panic!("expected leaf"),
        }
    }

    #[test]
    fn test_deep_nesting_keeps_every_leaf() {
        let depth = MAX_DEPTH + 8;
        let mut raw = String::from(
            "Content-Type: application/pdf\r\n\
             Content-Disposition: attachment; filename=deep.pdf\r\n\r\npdf",
        );
        for level in 0..depth {
            raw = format!(
                "Content-Type: multipart/mixed; boundary=b{level}\r\n\r\n\
                 --b{level}\r\nContent-Type: text/plain\r\n\r\nlevel {level}\r\n\
                 --b{level}\r\n{raw}\r\n--b{level}--\r\n"
            );
        }

        let message = Message::parse(raw.as_bytes());
        let leaves: Vec<_> = message.leaves().collect();
        assert_eq!(leaves.len(), depth + 1);
        assert_eq!(leaves[0].body, format!("level {}", depth - 1).into_bytes());
        assert_eq!(leaves[depth - 1].body, b"level 0");

        let last = leaves[depth];
        assert!(last.is_attachment());
        assert_eq!(last.filename(DecodeMode::Lossy).as_deref(), Some("deep.pdf"));
    }

    #[test]
    fn test_missing_closing_boundary_keeps_last_part() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "\r\n",
            "first\r\n",
            "--b\r\n",
            "\r\n",
            "truncated",
        );
        let message = Message::parse(raw.as_bytes());
        let bodies: Vec<_> = message.leaves().map(|l| l.body.clone()).collect();
        assert_eq!(bodies, vec![b"first".to_vec(), b"truncated".to_vec()]);
    }

    #[test]
    fn test_malformed_content_type_falls_back() {
        let message = Message::parse(b"Content-Type: garbage\r\n\r\ntext");
        let leaf = message.leaves().next().unwrap();
        assert!(leaf.content_type.is_plain_text());
    }

    #[test]
    fn test_content_id_strips_brackets() {
        let raw = concat!(
            "Content-Type: image/png\r\n",
            "Content-ID: <logo@example>\r\n",
            "\r\n",
            "png",
        );
        let message = Message::parse(raw.as_bytes());
        assert_eq!(message.leaves().next().unwrap().content_id(), Some("logo@example"));
    }

    #[test]
    fn test_quoted_printable_latin1_text() {
        let raw = concat!(
            "Content-Type: text/plain; charset=iso-8859-1\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "Caf=E9",
        );
        let message = Message::parse(raw.as_bytes());
        assert_eq!(message.leaves().next().unwrap().text(DecodeMode::Lossy), "Café");
    }
}
