//! Turning raw message bytes into window entries.

use std::cell::OnceCell;

use mailfox_mime::{
    Attachment, DecodeMode, Headers, Message, extract_attachments, extract_html, extract_text,
    split_header_body,
};

use crate::store::MessageId;

/// Shown when a message has no Subject header.
pub const NO_SUBJECT: &str = "[No Subject]";

/// Shown when a From or To header is missing.
pub const NO_ADDRESS: &str = "[No address]";

/// Shown when the Date header is missing.
pub const NO_DATE: &str = "[No date]";

/// One loaded message.
///
/// Header fields are decoded when the summary is built. The text body is
/// resolved on first request and then kept for the life of the summary.
#[derive(Debug)]
pub struct MessageSummary {
    /// Store identifier, valid within the selection that loaded it.
    pub id: MessageId,
    /// Decoded subject or [`NO_SUBJECT`].
    pub subject: String,
    /// Decoded From or [`NO_ADDRESS`].
    pub from: String,
    /// Decoded To or [`NO_ADDRESS`].
    pub to: String,
    /// Date header exactly as sent, or [`NO_DATE`].
    pub date: String,
    raw: Vec<u8>,
    parsed: OnceCell<Message>,
    body: OnceCell<String>,
}

impl MessageSummary {
    /// The raw message bytes as fetched.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The parsed MIME tree, built on first use.
    pub fn message(&self) -> &Message {
        self.parsed.get_or_init(|| Message::parse(&self.raw))
    }

    /// The text body if it has been resolved.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.get().map(String::as_str)
    }

    /// Returns true once the body has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.body.get().is_some()
    }

    /// Resolves the text body once and returns it.
    pub fn resolve_body(&self) -> &str {
        self.resolve_body_with(extract_text)
    }

    /// Like [`Self::resolve_body`] with a custom extractor.
    ///
    /// `extract` runs at most once per summary.
    pub fn resolve_body_with<F>(&self, extract: F) -> &str
    where
        F: FnOnce(&Message) -> String,
    {
        self.body.get_or_init(|| extract(self.message()))
    }

    /// The HTML alternative, if the message has one.
    #[must_use]
    pub fn html(&self) -> Option<String> {
        extract_html(self.message())
    }

    /// Attachments in walk order, names sanitized but not de-duplicated.
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        extract_attachments(self.message())
    }
}

/// Builds a summary from raw message bytes.
///
/// Only the header block is examined here. Missing headers become
/// sentinels and headers whose encoded words cannot be decoded are kept raw,
/// so this never fails.
#[must_use]
pub fn parse_summary(raw: Vec<u8>, id: MessageId) -> MessageSummary {
    let (header_block, _) = split_header_body(&raw);
    let headers = Headers::parse(header_block);

    let subject = decoded(&headers, "Subject").unwrap_or_else(|| NO_SUBJECT.to_string());
    let from = decoded(&headers, "From").unwrap_or_else(|| NO_ADDRESS.to_string());
    let to = decoded(&headers, "To").unwrap_or_else(|| NO_ADDRESS.to_string());
    let date = headers
        .get("Date")
        .filter(|d| !d.trim().is_empty())
        .map_or_else(|| NO_DATE.to_string(), str::to_string);

    MessageSummary {
        id,
        subject,
        from,
        to,
        date,
        raw,
        parsed: OnceCell::new(),
        body: OnceCell::new(),
    }
}

fn decoded(headers: &Headers, name: &str) -> Option<String> {
    headers
        .get_decoded(name, DecodeMode::Lossy)
        .filter(|value| !value.trim().is_empty())
}
