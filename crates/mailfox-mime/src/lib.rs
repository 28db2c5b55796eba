//! # mailfox-mime
//!
//! Lenient MIME decoding for reading mail that arrives in whatever shape
//! the sending client produced.
//!
//! ## Features
//!
//! - **Total parsing**: [`Message::parse`] never fails; malformed pieces
//!   degrade to `text/plain` leaves
//! - **Part tree**: leaves and multipart containers, walked depth-first
//! - **Decoding**: Base64, Quoted-Printable, RFC 2047 encoded words,
//!   RFC 2231 parameters, any charset `encoding_rs` knows
//! - **Explicit lossy mode**: [`DecodeMode::Lossy`] drops undecodable bytes
//! - **Extraction**: plain text, HTML and attachments with sanitized names
//!
//! ## Quick Start
//!
//! ```
//! use mailfox_mime::{Message, extract_attachments, extract_html, extract_text};
//!
//! let raw = b"Subject: Hello\r\nContent-Type: text/plain\r\n\r\nHi there";
//! let message = Message::parse(raw);
//!
//! assert_eq!(extract_text(&message), "Hi there");
//! assert_eq!(extract_html(&message), None);
//! assert!(extract_attachments(&message).is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod extract;
mod header;
mod message;

pub mod encoding;

pub use content_type::{ContentDisposition, ContentType, DispositionKind};
pub use encoding::DecodeMode;
pub use error::{Error, Result};
pub use extract::{
    Attachment, EMPTY_BODY, NO_TEXT_CONTENT, extract_attachments, extract_html, extract_text,
    guess_extension, sanitize_filename,
};
pub use header::{Headers, split_header_body};
pub use message::{Leaf, Leaves, Message, Multipart, Part, PartKind, TransferEncoding};
