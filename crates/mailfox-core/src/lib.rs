//! # mailfox-core
//!
//! The mailbox session and message pipeline behind the mailfox terminal
//! mail explorer.
//!
//! This crate provides:
//! - [`MailStore`], the seam to the remote mailbox, and [`ImapStore`]
//! - [`MailboxSession`]: folder selection, the loaded message window and
//!   cursor navigation
//! - [`MessageSummary`] with a lazily resolved, memoized text body
//! - [`Exporter`]: text, HTML, raw and attachment export
//! - Saved account profiles and persisted settings
//!
//! ```ignore
//! use mailfox_core::{ImapStore, MailboxSession};
//!
//! let mut session = MailboxSession::<ImapStore>::connect(&params).await?;
//! session.select_folder("INBOX").await?;
//! session.load_messages(20).await?;
//! println!("{}", session.view_current()?.resolve_body());
//! session.disconnect().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod decoder;
mod error;
pub mod export;
pub mod session;
pub mod settings;
pub mod store;

pub use account::{AccountBook, AccountProfile};
pub use decoder::{MessageSummary, NO_ADDRESS, NO_DATE, NO_SUBJECT, parse_summary};
pub use error::{Error, Result};
pub use export::{
    ArtifactKind, AttachmentBatch, ExportArtifact, ExportError, ExportFormat, ExportReport,
    Exporter, StepOutcome, base_name, sanitize_subject,
};
pub use session::{LoadReport, MailboxSession, SessionError, SessionState};
pub use settings::{Settings, default_config_dir};
pub use store::{
    ConnectParams, ImapStore, MailStore, MessageId, SearchCriteria, Security, StoreError,
};
