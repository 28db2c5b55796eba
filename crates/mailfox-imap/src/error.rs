//! Client errors.

use thiserror::Error;

/// Everything a [`Client`](crate::Client) call can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// The socket failed.
    #[error("connection I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The TLS layer failed.
    #[error("TLS failure: {0}")]
    Tls(#[from] rustls::Error),

    /// The host is not usable as a TLS server name.
    #[error("not a valid server name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Tagged `NO`.
    #[error("server refused: {0}")]
    No(String),

    /// Tagged `BAD`.
    #[error("server rejected command: {0}")]
    Bad(String),

    /// The server closed the session.
    #[error("server closed the connection: {0}")]
    Bye(String),

    /// The command needs a different connection state.
    #[error("{0}")]
    InvalidState(String),

    /// The server sent something the client cannot follow.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// `NO` or `BAD`: the command failed but the connection is still usable.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::No(_) | Self::Bad(_))
    }
}

/// Result alias for client calls.
pub type Result<T> = std::result::Result<T, Error>;
