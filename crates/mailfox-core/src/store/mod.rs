//! The mail store seam.
//!
//! [`MailboxSession`](crate::MailboxSession) talks to the remote mailbox only
//! through [`MailStore`], so the session logic can be driven by an in-memory
//! store in tests and by [`ImapStore`] in the application.

mod imap;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use imap::ImapStore;

/// Errors reported by a [`MailStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Could not reach or authenticate with the server.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The server refused the command (NO/BAD).
    #[error("Server rejected command: {0}")]
    Rejected(String),

    /// I/O, framing or protocol failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The command needs a selected folder.
    #[error("No folder selected")]
    NotSelected,
}

impl From<mailfox_imap::Error> for StoreError {
    fn from(err: mailfox_imap::Error) -> Self {
        if err.is_rejection() {
            Self::Rejected(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Security {
    /// Implicit TLS.
    #[default]
    Tls,
    /// Plain TCP, for local or test servers.
    Plain,
}

impl Security {
    /// Conventional IMAP port for the mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Tls => 993,
            Self::Plain => 143,
        }
    }
}

/// Everything needed to open a store.
#[derive(Clone)]
pub struct ConnectParams {
    /// Server host name.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Login name.
    pub user: String,
    /// Password. Never logged or persisted.
    pub secret: String,
    /// Transport security.
    pub security: Security,
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .field("security", &self.security)
            .finish()
    }
}

/// Opaque message identifier, valid only within the folder selection that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps a store token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the store token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which messages a search selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// Every message in the folder.
    All,
    /// Full-text match anywhere in the message.
    Text(String),
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Text(term) => write!(f, "TEXT {}", mailfox_imap::quote(term)),
        }
    }
}

/// A remote mailbox reachable over a request/response protocol.
///
/// One request is outstanding at a time; every call completes before the
/// next is issued.
#[allow(async_fn_in_trait)]
pub trait MailStore: Sized {
    /// Connects and authenticates.
    async fn connect(params: &ConnectParams) -> Result<Self, StoreError>;

    /// Names of all folders in server order.
    async fn list_folders(&mut self) -> Result<Vec<String>, StoreError>;

    /// Selects a folder and returns its message count.
    async fn select_folder(&mut self, name: &str) -> Result<u32, StoreError>;

    /// Identifiers matching `criteria` in the selected folder, oldest first.
    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<MessageId>, StoreError>;

    /// The complete raw message.
    async fn fetch_raw(&mut self, id: &MessageId) -> Result<Vec<u8>, StoreError>;

    /// Closes the selected folder.
    async fn close(&mut self) -> Result<(), StoreError>;

    /// Ends the session.
    async fn logout(&mut self) -> Result<(), StoreError>;
}
