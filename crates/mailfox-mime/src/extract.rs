//! Body and attachment extraction.
//!
//! All three extractors walk the same depth-first leaf order and differ
//! only in the predicate they apply.

use crate::encoding::DecodeMode;
use crate::message::{Leaf, Message, Part, PartKind};

/// Returned by [`extract_text`] when no plain-text part exists.
pub const NO_TEXT_CONTENT: &str = "[No plain text content found]";

/// Returned by [`extract_text`] for a single-part message with an empty body.
pub const EMPTY_BODY: &str = "[Empty body]";

/// Characters removed from attachment filenames.
const RESERVED_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// An attachment pulled out of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Sanitized filename, or a synthesized one.
    pub filename: String,
    /// `type/subtype` of the part.
    pub content_type: String,
    /// True when the part had only a Content-ID and the name was synthesized.
    pub inline: bool,
    /// Decoded payload.
    pub data: Vec<u8>,
}

fn is_displayable(leaf: &Leaf, kind: PartKind) -> bool {
    leaf.kind() == kind && !leaf.is_attachment() && !leaf.body.is_empty()
}

/// Returns the first non-attachment `text/plain` part as text.
///
/// Never fails: returns [`NO_TEXT_CONTENT`] when there is no such part and
/// [`EMPTY_BODY`] when the message is a single empty plain-text part.
#[must_use]
pub fn extract_text(message: &Message) -> String {
    if let Some(leaf) = message.find_leaf(|leaf| is_displayable(leaf, PartKind::PlainText)) {
        return leaf.text(DecodeMode::Lossy);
    }

    match &message.root {
        Part::Leaf(leaf) if leaf.kind() == PartKind::PlainText && leaf.body.is_empty() => {
            EMPTY_BODY.to_string()
        }
        _ => NO_TEXT_CONTENT.to_string(),
    }
}

/// Returns the first non-attachment `text/html` part as text, if any.
#[must_use]
pub fn extract_html(message: &Message) -> Option<String> {
    message
        .find_leaf(|leaf| is_displayable(leaf, PartKind::Html))
        .map(|leaf| leaf.text(DecodeMode::Lossy))
}

/// Collects attachments in walk order.
///
/// A leaf is an attachment if it carries a filename, or if it carries a
/// Content-ID without one; the latter gets a name synthesized from a running
/// counter and its content type. Leaves with neither are skipped. Names that
/// sanitize to nothing become `attachment_<n>`. Duplicate names are kept.
#[must_use]
pub fn extract_attachments(message: &Message) -> Vec<Attachment> {
    let mut attachments = Vec::new();

    for leaf in message.leaves() {
        let index = attachments.len();
        let (name, inline) = match (leaf.filename(DecodeMode::Lossy), leaf.content_id()) {
            (Some(name), _) => (name, false),
            (None, Some(_)) => (inline_name(index, leaf), true),
            (None, None) => continue,
        };

        let mut filename = sanitize_filename(&name);
        if filename.is_empty() {
            filename = format!("attachment_{index}");
        }

        attachments.push(Attachment {
            filename,
            content_type: leaf.content_type.essence(),
            inline,
            data: leaf.body.clone(),
        });
    }

    attachments
}

fn inline_name(index: usize, leaf: &Leaf) -> String {
    guess_extension(&leaf.content_type.essence()).map_or_else(
        || format!("inline_content_{index}"),
        |ext| format!("inline_image_{index}.{ext}"),
    )
}

/// Best-effort file extension for a `type/subtype`.
#[must_use]
pub fn guess_extension(essence: &str) -> Option<&'static str> {
    let preferred = match essence {
        "image/jpeg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/svg+xml" => Some("svg"),
        "text/plain" => Some("txt"),
        "text/html" => Some("html"),
        "application/pdf" => Some("pdf"),
        _ => None,
    };

    preferred.or_else(|| {
        mime_guess::get_mime_extensions_str(essence).and_then(|exts| exts.first().copied())
    })
}

/// Removes path separators, reserved characters and control characters.
///
/// The result may be empty; `.` and `..` are rejected as empty.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !RESERVED_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();

    if cleaned == "." || cleaned == ".." {
        String::new()
    } else {
        cleaned.to_string()
    }
}
