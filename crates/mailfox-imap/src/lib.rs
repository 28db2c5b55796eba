//! # mailfox-imap
//!
//! A small IMAP4rev1 client covering what a read-only mail browser needs:
//! LOGIN, LIST, SELECT, SEARCH, FETCH RFC822, CLOSE and LOGOUT.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailfox_imap::{Client, connect_tls};
//!
//! #[tokio::main]
//! async fn main() -> mailfox_imap::Result<()> {
//!     let stream = connect_tls("imap.example.com", 993).await?;
//!     let mut client = Client::from_stream(stream).await?;
//!     client.login("user@example.com", "password").await?;
//!
//!     let exists = client.select("INBOX").await?;
//!     println!("{exists} messages");
//!
//!     for id in client.search("ALL").await? {
//!         let raw = client.fetch_rfc822(&id).await?;
//!         println!("{id}: {} bytes", raw.len());
//!     }
//!
//!     client.logout().await
//! }
//! ```
//!
//! Strings are sent as atoms, quoted strings or synchronizing literals
//! depending on their content, so non-ASCII passwords and mailbox names
//! work without extra care from the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod response;

pub use command::{Command, TagGenerator, quote};
pub use connection::{
    Client, ConnectionState, FramedStream, ImapStream, connect_plain, connect_tls,
    create_tls_connector,
};
pub use error::{Error, Result};
pub use response::{ListEntry, Response, Status, Untagged};
