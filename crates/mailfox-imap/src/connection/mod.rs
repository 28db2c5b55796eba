//! Connections: transport streams, framing, and the client itself.

mod client;
mod framed;
mod stream;

pub use client::{Client, ConnectionState};
pub use framed::{FramedStream, MAX_LINE_LENGTH, MAX_LITERAL_SIZE};
pub use stream::{ImapStream, connect_plain, connect_tls, create_tls_connector};
