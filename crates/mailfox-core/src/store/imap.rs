//! [`MailStore`] over the IMAP client.

use mailfox_imap::{Client, ConnectionState, ImapStream, connect_plain, connect_tls};
use tracing::{debug, info};

use super::{ConnectParams, MailStore, MessageId, SearchCriteria, Security, StoreError};

/// IMAP-backed mail store.
#[derive(Debug)]
pub struct ImapStore {
    client: Client<ImapStream>,
}

impl ImapStore {
    fn require_selection(&self) -> Result<(), StoreError> {
        if self.client.selected().is_some() {
            Ok(())
        } else {
            Err(StoreError::NotSelected)
        }
    }
}

impl MailStore for ImapStore {
    async fn connect(params: &ConnectParams) -> Result<Self, StoreError> {
        let connection = |e: mailfox_imap::Error| StoreError::Connection(e.to_string());

        let stream = match params.security {
            Security::Tls => connect_tls(&params.server, params.port).await,
            Security::Plain => connect_plain(&params.server, params.port).await,
        }
        .map_err(connection)?;

        let mut client = Client::from_stream(stream).await.map_err(connection)?;
        if *client.state() == ConnectionState::NotAuthenticated {
            client
                .login(&params.user, &params.secret)
                .await
                .map_err(connection)?;
        }

        info!(server = %params.server, user = %params.user, "logged in");
        Ok(Self { client })
    }

    async fn list_folders(&mut self) -> Result<Vec<String>, StoreError> {
        let entries = self.client.list("", "*").await?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    async fn select_folder(&mut self, name: &str) -> Result<u32, StoreError> {
        Ok(self.client.select(name).await?)
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<MessageId>, StoreError> {
        self.require_selection()?;
        let ids = self.client.search(&criteria.to_string()).await?;
        debug!(%criteria, matches = ids.len(), "search finished");
        Ok(ids.into_iter().map(MessageId::new).collect())
    }

    async fn fetch_raw(&mut self, id: &MessageId) -> Result<Vec<u8>, StoreError> {
        self.require_selection()?;
        Ok(self.client.fetch_rfc822(id.as_str()).await?)
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.require_selection()?;
        Ok(self.client.close().await?)
    }

    async fn logout(&mut self) -> Result<(), StoreError> {
        Ok(self.client.logout().await?)
    }
}
