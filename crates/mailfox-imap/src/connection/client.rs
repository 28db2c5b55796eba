//! IMAP client connection.
//!
//! The client tracks the protocol state at runtime and refuses commands
//! that are not valid in the current state:
//!
//! ```text
//! NotAuthenticated --login--> Authenticated --select--> Selected
//!                                   ^                      |
//!                                   +-------close----------+
//! ```
//!
//! `logout` is valid from every state and is final.

use tokio::io::{AsyncRead, AsyncWrite};

use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::response::{ListEntry, Response, Status, Untagged};
use crate::{Error, Result};

/// Protocol state of a [`Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Greeting received, not logged in.
    NotAuthenticated,
    /// Logged in, no mailbox selected.
    Authenticated,
    /// A mailbox is selected.
    Selected(String),
    /// LOGOUT was sent or the server said BYE.
    LoggedOut,
}

/// IMAP client over any async byte stream.
pub struct Client<S> {
    stream: FramedStream<S>,
    tags: TagGenerator,
    state: ConnectionState,
}

impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tags", &self.tags)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a connected stream by reading the server greeting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bye`] if the server refuses the connection, or a
    /// protocol error if the greeting is not a greeting.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut stream = FramedStream::new(stream);
        let greeting = stream.read_response().await?;

        let state = match Response::parse(&greeting)? {
            Response::Untagged(Untagged::Condition { status, text }) => match status {
                Status::Ok => ConnectionState::NotAuthenticated,
                Status::PreAuth => ConnectionState::Authenticated,
                Status::Bye => return Err(Error::Bye(text)),
                Status::No | Status::Bad => {
                    return Err(Error::Protocol(format!("unexpected greeting: {text}")));
                }
            },
            _ => return Err(Error::Protocol("missing server greeting".to_string())),
        };

        tracing::debug!(?state, "received server greeting");
        Ok(Self {
            stream,
            tags: TagGenerator::default(),
            state,
        })
    }

    /// Returns the current protocol state.
    #[must_use]
    pub const fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Returns the selected mailbox, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::Selected(name) => Some(name),
            _ => None,
        }
    }

    /// Logs in with a username and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::No`] if the credentials are refused.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.require(matches!(self.state, ConnectionState::NotAuthenticated), "LOGIN")?;

        self.execute(&Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await?;

        self.state = ConnectionState::Authenticated;
        Ok(())
    }

    /// Lists mailboxes matching `pattern` under `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if not authenticated or the server refuses.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListEntry>> {
        self.require(self.is_authenticated(), "LIST")?;

        let untagged = self
            .execute(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;

        Ok(untagged
            .into_iter()
            .filter_map(|u| match u {
                Untagged::List(entry) => Some(entry),
                _ => None,
            })
            .collect())
    }

    /// Selects a mailbox and returns its message count.
    ///
    /// A refused SELECT leaves no mailbox selected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::No`] if the mailbox does not exist or cannot be opened.
    pub async fn select(&mut self, mailbox: &str) -> Result<u32> {
        self.require(self.is_authenticated(), "SELECT")?;

        let result = self
            .execute(&Command::Select {
                mailbox: mailbox.to_string(),
            })
            .await;

        let untagged = match result {
            Ok(untagged) => untagged,
            Err(err) => {
                if err.is_rejection() {
                    self.state = ConnectionState::Authenticated;
                }
                return Err(err);
            }
        };

        let exists = untagged
            .iter()
            .filter_map(|u| match u {
                Untagged::Exists(n) => Some(*n),
                _ => None,
            })
            .next_back()
            .unwrap_or(0);

        tracing::debug!(mailbox, exists, "mailbox selected");
        self.state = ConnectionState::Selected(mailbox.to_string());
        Ok(exists)
    }

    /// Runs SEARCH with pre-rendered criteria and returns sequence numbers
    /// in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if no mailbox is selected or the server refuses.
    pub async fn search(&mut self, criteria: &str) -> Result<Vec<String>> {
        self.require(self.selected().is_some(), "SEARCH")?;

        let untagged = self
            .execute(&Command::Search {
                criteria: criteria.to_string(),
            })
            .await?;

        Ok(untagged
            .into_iter()
            .flat_map(|u| match u {
                Untagged::Search(ids) => ids,
                _ => Vec::new(),
            })
            .collect())
    }

    /// Fetches the complete raw message with sequence number `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if no mailbox is selected, the server refuses, or
    /// the response carried no message data for `id`.
    pub async fn fetch_rfc822(&mut self, id: &str) -> Result<Vec<u8>> {
        self.require(self.selected().is_some(), "FETCH")?;

        let untagged = self
            .execute(&Command::FetchRfc822 { id: id.to_string() })
            .await?;

        untagged
            .into_iter()
            .find_map(|u| match u {
                Untagged::Fetch {
                    id: fetched,
                    rfc822: Some(data),
                } if fetched == id => Some(data),
                _ => None,
            })
            .ok_or_else(|| Error::Protocol(format!("no message data returned for {id}")))
    }

    /// Closes the selected mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if no mailbox is selected or the server refuses.
    pub async fn close(&mut self) -> Result<()> {
        self.require(self.selected().is_some(), "CLOSE")?;
        self.execute(&Command::Close).await?;
        self.state = ConnectionState::Authenticated;
        Ok(())
    }

    /// Ends the session and shuts the stream down.
    ///
    /// The client is logged out afterwards even if the command fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses or the stream fails. A BYE
    /// followed by the tagged OK is success.
    pub async fn logout(&mut self) -> Result<()> {
        if self.state == ConnectionState::LoggedOut {
            return Ok(());
        }

        let result = self.execute(&Command::Logout).await;
        self.state = ConnectionState::LoggedOut;
        let shutdown = self.stream.shutdown().await;
        result?;
        shutdown
    }

    const fn is_authenticated(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Authenticated | ConnectionState::Selected(_)
        )
    }

    fn require(&self, allowed: bool, command: &str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "{command} is not valid in state {:?}",
                self.state
            )))
        }
    }

    /// Sends a command and collects untagged data until its tagged completion.
    async fn execute(&mut self, command: &Command) -> Result<Vec<Untagged>> {
        let tag = self.tags.next_tag();
        let segments = command.serialize(&tag);
        tracing::debug!(tag = %tag, command = command.name(), "sending command");

        let mut untagged = Vec::new();
        let last = segments.len().saturating_sub(1);

        for (index, segment) in segments.iter().enumerate() {
            self.stream.write_command(segment).await?;
            if index < last {
                self.await_continuation(&tag, &mut untagged).await?;
            }
        }

        loop {
            let raw = self.read_response().await?;
            match Response::parse(&raw)? {
                Response::Tagged {
                    tag: done,
                    status,
                    text,
                } if done == tag => {
                    tracing::debug!(tag = %tag, ?status, "command completed");
                    return self.check_status(status, text).map(|()| untagged);
                }
                Response::Tagged { tag: other, .. } => {
                    tracing::debug!(tag = %other, "ignoring completion for another tag");
                }
                Response::Untagged(data) => self.collect(data, &mut untagged),
                Response::Continuation => {
                    return Err(Error::Protocol("unexpected continuation request".to_string()));
                }
            }
        }
    }

    /// Waits for `+` after a literal header.
    async fn await_continuation(&mut self, tag: &str, untagged: &mut Vec<Untagged>) -> Result<()> {
        loop {
            let raw = self.read_response().await?;
            match Response::parse(&raw)? {
                Response::Continuation => return Ok(()),
                Response::Tagged {
                    tag: done,
                    status,
                    text,
                } if done == tag => {
                    self.check_status(status, text)?;
                    return Err(Error::Protocol(
                        "command completed before literal was sent".to_string(),
                    ));
                }
                Response::Tagged { .. } => {}
                Response::Untagged(data) => self.collect(data, untagged),
            }
        }
    }

    fn collect(&mut self, data: Untagged, untagged: &mut Vec<Untagged>) {
        if let Untagged::Condition {
            status: Status::Bye,
            text,
        } = &data
        {
            tracing::debug!(text = %text, "server sent BYE");
            self.state = ConnectionState::LoggedOut;
        }
        untagged.push(data);
    }

    fn check_status(&self, status: Status, text: String) -> Result<()> {
        match status {
            Status::Ok | Status::PreAuth => Ok(()),
            Status::No => Err(Error::No(text)),
            Status::Bad => Err(Error::Bad(text)),
            Status::Bye => Err(Error::Bye(text)),
        }
        .inspect_err(|err| tracing::debug!(state = ?self.state, "command failed: {err}"))
    }

    /// Reads a response, turning end-of-stream after BYE into [`Error::Bye`].
    async fn read_response(&mut self) -> Result<Vec<u8>> {
        match self.stream.read_response().await {
            Err(Error::Io(err)) if self.state == ConnectionState::LoggedOut => {
                Err(Error::Bye(err.to_string()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::{Builder, Mock};

    /// A mock that opens with a PREAUTH greeting.
    fn preauth() -> Builder {
        let mut builder = Builder::new();
        builder.read(b"* PREAUTH ready\r\n");
        builder
    }

    async fn client(mut builder: Builder) -> Client<Mock> {
        Client::from_stream(builder.build()).await.unwrap()
    }

    #[tokio::test]
    async fn test_greeting_ok() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let client = Client::from_stream(mock).await.unwrap();
        assert_eq!(client.state(), &ConnectionState::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_greeting_preauth() {
        let mock = Builder::new().read(b"* PREAUTH welcome back\r\n").build();
        let client = Client::from_stream(mock).await.unwrap();
        assert_eq!(client.state(), &ConnectionState::Authenticated);
    }

    #[tokio::test]
    async fn test_greeting_bye() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let err = Client::from_stream(mock).await.unwrap_err();
        assert!(matches!(err, Error::Bye(text) if text == "too many connections"));
    }

    #[tokio::test]
    async fn test_login_success() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN me@example.com secret\r\n")
            .read(b"A0000 OK LOGIN completed\r\n")
            .build();
        let mut client = Client::from_stream(mock).await.unwrap();

        client.login("me@example.com", "secret").await.unwrap();
        assert_eq!(client.state(), &ConnectionState::Authenticated);
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN me wrong\r\n")
            .read(b"A0000 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .build();
        let mut client = Client::from_stream(mock).await.unwrap();

        let err = client.login("me", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::No(_)));
        assert_eq!(client.state(), &ConnectionState::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_login_with_literal_password() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 LOGIN me {9}\r\n")
            .read(b"+ go ahead\r\n")
            .write("pässword\r\n".as_bytes())
            .read(b"A0000 OK done\r\n")
            .build();
        let mut client = Client::from_stream(mock).await.unwrap();

        client.login("me", "pässword").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_collects_entries() {
        let mut builder = preauth();
        builder
            .write(b"A0000 LIST \"\" *\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
            .read(b"* LIST (\\HasNoChildren \\Sent) \"/\" \"Sent Items\"\r\n")
            .read(b"A0000 OK LIST completed\r\n");
        let mut client = client(builder).await;

        let entries = client.list("", "*").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["INBOX", "Sent Items"]);
    }

    #[tokio::test]
    async fn test_select_reports_exists() {
        let mut builder = preauth();
        builder
            .write(b"A0000 SELECT INBOX\r\n")
            .read(b"* 17 EXISTS\r\n* 0 RECENT\r\n")
            .read(b"* FLAGS (\\Seen \\Answered)\r\n")
            .read(b"A0000 OK [READ-WRITE] SELECT completed\r\n");
        let mut client = client(builder).await;

        assert_eq!(client.select("INBOX").await.unwrap(), 17);
        assert_eq!(client.selected(), Some("INBOX"));
    }

    #[tokio::test]
    async fn test_failed_select_deselects() {
        let mut builder = preauth();
        builder
            .write(b"A0000 SELECT INBOX\r\n")
            .read(b"* 2 EXISTS\r\nA0000 OK done\r\n")
            .write(b"A0001 SELECT Missing\r\n")
            .read(b"A0001 NO Mailbox does not exist\r\n");
        let mut client = client(builder).await;

        client.select("INBOX").await.unwrap();
        let err = client.select("Missing").await.unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(client.selected(), None);
    }

    #[tokio::test]
    async fn test_search_requires_selection() {
        let mut client = client(preauth()).await;
        let err = client.search("ALL").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_search_and_fetch() {
        let mut builder = preauth();
        builder
            .write(b"A0000 SELECT INBOX\r\n")
            .read(b"* 3 EXISTS\r\nA0000 OK done\r\n")
            .write(b"A0001 SEARCH TEXT \"invoice\"\r\n")
            .read(b"* SEARCH 1 3\r\nA0001 OK SEARCH completed\r\n")
            .write(b"A0002 FETCH 3 RFC822\r\n")
            .read(b"* 3 FETCH (RFC822 {14}\r\n")
            .read(b"Subject: hi\r\n\r\n)\r\n")
            .read(b"A0002 OK FETCH completed\r\n");
        let mut client = client(builder).await;

        client.select("INBOX").await.unwrap();
        let ids = client.search("TEXT \"invoice\"").await.unwrap();
        assert_eq!(ids, vec!["1", "3"]);

        let raw = client.fetch_rfc822("3").await.unwrap();
        assert_eq!(raw, b"Subject: hi\r\n\r\n");
    }

    #[tokio::test]
    async fn test_fetch_without_data_is_error() {
        let mut builder = preauth();
        builder
            .write(b"A0000 SELECT INBOX\r\n")
            .read(b"A0000 OK done\r\n")
            .write(b"A0001 FETCH 9 RFC822\r\n")
            .read(b"A0001 OK nothing\r\n");
        let mut client = client(builder).await;

        client.select("INBOX").await.unwrap();
        let err = client.fetch_rfc822("9").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_close_returns_to_authenticated() {
        let mut builder = preauth();
        builder
            .write(b"A0000 SELECT INBOX\r\n")
            .read(b"A0000 OK done\r\n")
            .write(b"A0001 CLOSE\r\n")
            .read(b"A0001 OK CLOSE completed\r\n");
        let mut client = client(builder).await;

        client.select("INBOX").await.unwrap();
        client.close().await.unwrap();
        assert_eq!(client.state(), &ConnectionState::Authenticated);
    }

    #[tokio::test]
    async fn test_logout_accepts_bye() {
        let mut builder = preauth();
        builder
            .write(b"A0000 LOGOUT\r\n")
            .read(b"* BYE logging out\r\nA0000 OK LOGOUT completed\r\n");
        let mut client = client(builder).await;

        client.logout().await.unwrap();
        assert_eq!(client.state(), &ConnectionState::LoggedOut);
        client.logout().await.unwrap();
    }

    #[tokio::test]
    async fn test_eof_after_bye_is_bye() {
        let mut builder = preauth();
        builder
            .write(b"A0000 SELECT INBOX\r\n")
            .read(b"* BYE server shutting down\r\n");
        let mut client = client(builder).await;

        let err = client.select("INBOX").await.unwrap_err();
        assert!(matches!(err, Error::Bye(_)));
    }
}
