//! Line and literal framing.
//!
//! A server response is one CRLF-terminated line, unless that line ends in a
//! literal announcement `{n}`, in which case `n` raw bytes follow and the
//! response continues on the line after them.

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

const BUFFER_SIZE: usize = 8192;

/// Upper bound on a single line.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Upper bound on a single literal.
pub const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Buffered reader/writer speaking IMAP framing.
pub struct FramedStream<S> {
    reader: BufReader<S>,
    out: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(BUFFER_SIZE, stream),
            out: BytesMut::with_capacity(BUFFER_SIZE),
        }
    }

    /// Reads one complete response, literals included.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, end of stream, or when a line or
    /// literal exceeds its cap.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(len) = literal_length(&line) else {
                return Ok(response);
            };
            if len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal too large: {len} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }

            let start = response.len();
            response.resize(start + len, 0);
            self.reader.read_exact(&mut response[start..]).await?;
        }
    }

    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
            }

            // CR may be the last byte of the previous chunk.
            let search_from = line.len().saturating_sub(1);
            line.extend_from_slice(available);
            let taken = available.len();

            if let Some(pos) = find_crlf(&line[search_from..]) {
                let end = search_from + pos + 2;
                let unused = line.len() - end;
                self.reader.consume(taken - unused);
                line.truncate(end);
                return Ok(line);
            }

            self.reader.consume(taken);
            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }
    }

    /// Writes and flushes one command segment.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub async fn write_command(&mut self, segment: &[u8]) -> Result<()> {
        self.out.clear();
        self.out.extend_from_slice(segment);

        let stream = self.reader.get_mut();
        stream.write_all(&self.out).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Shuts down the write half.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Length of the literal announced at the end of `line`, if any.
///
/// Accepts both `{n}` and the non-synchronizing `{n+}`.
fn literal_length(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"\r\n")?.strip_suffix(b"}")?;
    let body = body.strip_suffix(b"+").unwrap_or(body);
    let open = body.iter().rposition(|&b| b == b'{')?;
    let digits = &body[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_literal_length() {
        assert_eq!(literal_length(b"* 1 FETCH (RFC822 {342}\r\n"), Some(342));
        assert_eq!(literal_length(b"{7+}\r\n"), Some(7));
        assert_eq!(literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(literal_length(b"* OK done\r\n"), None);
        assert_eq!(literal_length(b"{12}"), None);
        assert_eq!(literal_length(b"{}\r\n"), None);
        assert_eq!(literal_length(b"{1x}\r\n"), None);
    }

    #[tokio::test]
    async fn test_reads_responses_in_order() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n* 3 EXISTS\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"* OK ready\r\n");
        assert_eq!(framed.read_response().await.unwrap(), b"* 3 EXISTS\r\n");
    }

    #[tokio::test]
    async fn test_crlf_split_across_reads() {
        let mock = Builder::new().read(b"* OK ready\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_literal_containing_crlf() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (RFC822 {9}\r\n")
            .read(b"A: b\r\n\r\nx")
            .read(b")\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (RFC822 {9}\r\nA: b\r\n\r\nx)\r\n");
    }

    #[tokio::test]
    async fn test_oversized_literal_rejected() {
        let header = format!("* 1 FETCH (RFC822 {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_overlong_line_rejected() {
        let line = "x".repeat(MAX_LINE_LENGTH + 10);
        let mock = Builder::new().read(line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("line too long"));
    }

    #[tokio::test]
    async fn test_eof_is_error() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock);

        assert!(matches!(framed.read_response().await, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_write_command() {
        let mock = Builder::new().write(b"A0000 CLOSE\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed.write_command(b"A0000 CLOSE\r\n").await.unwrap();
    }
}
