//! Error types for the core library.

use thiserror::Error;

/// Errors from the settings file and the account book.
///
/// Mailbox and export operations have their own types
/// ([`SessionError`](crate::SessionError), [`ExportError`](crate::ExportError)).
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
