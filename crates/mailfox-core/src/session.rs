//! The mailbox session: connection lifecycle, folder selection, the loaded
//! message window and its cursor.

use tracing::{debug, info, warn};

use crate::decoder::{MessageSummary, parse_summary};
use crate::store::{ConnectParams, MailStore, MessageId, SearchCriteria, StoreError};

/// Errors reported by [`MailboxSession`].
///
/// None of these leave the window and cursor inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Connecting or logging in failed.
    #[error("Connection failed: {0}")]
    Connection(#[source] StoreError),

    /// The folder could not be selected.
    #[error("Folder {folder:?} is unavailable: {source}")]
    FolderUnavailable {
        /// The requested folder.
        folder: String,
        /// What the store reported.
        #[source]
        source: StoreError,
    },

    /// Listing identifiers failed or the folder is empty.
    #[error("Could not load messages: {0}")]
    LoadFailed(String),

    /// A search returned no identifiers.
    #[error("No messages match {0:?}")]
    NoMatches(String),

    /// The session has been disconnected.
    #[error("Not connected")]
    NotConnected,

    /// No messages are loaded.
    #[error("No messages loaded")]
    EmptyWindow,

    /// Any other store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection.
    Disconnected,
    /// Connected, no folder selected.
    Connected,
    /// A folder is selected but has not been loaded since.
    FolderSelected,
    /// The window holds messages from the selected folder.
    MessagesLoaded,
}

/// Outcome of a batch load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Identifiers the batch tried to fetch.
    pub requested: usize,
    /// Summaries now in the window.
    pub loaded: usize,
    /// Identifiers skipped because their fetch failed.
    pub failed: usize,
}

/// A connected mailbox and the user's position in it.
///
/// The window is replaced wholesale by every load or search; the cursor is
/// always a valid index while the window is non-empty.
#[derive(Debug)]
pub struct MailboxSession<S> {
    store: Option<S>,
    folder: Option<String>,
    total: u32,
    messages: Vec<MessageSummary>,
    cursor: usize,
    loaded: bool,
}

impl<S: MailStore> MailboxSession<S> {
    /// Wraps an already connected store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store: Some(store),
            folder: None,
            total: 0,
            messages: Vec::new(),
            cursor: 0,
            loaded: false,
        }
    }

    /// Connects a new store and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connection`] if the store cannot be opened.
    pub async fn connect(params: &ConnectParams) -> Result<Self, SessionError> {
        let store = S::connect(params)
            .await
            .map_err(SessionError::Connection)?;
        info!(server = %params.server, "session connected");
        Ok(Self::new(store))
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        match (&self.store, &self.folder) {
            (None, _) => SessionState::Disconnected,
            (Some(_), None) => SessionState::Connected,
            (Some(_), Some(_)) if self.loaded => SessionState::MessagesLoaded,
            (Some(_), Some(_)) => SessionState::FolderSelected,
        }
    }

    /// Returns true until [`Self::disconnect`] runs.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// The selected folder, if any.
    #[must_use]
    pub fn selected_folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    /// Message count the server reported for the selected folder.
    #[must_use]
    pub const fn total_messages(&self) -> u32 {
        self.total
    }

    /// The loaded window in fetch order.
    #[must_use]
    pub fn messages(&self) -> &[MessageSummary] {
        &self.messages
    }

    /// Index of the current message. Meaningless when the window is empty.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// The message under the cursor without resolving its body.
    #[must_use]
    pub fn current(&self) -> Option<&MessageSummary> {
        self.messages.get(self.cursor)
    }

    fn store(&mut self) -> Result<&mut S, SessionError> {
        self.store.as_mut().ok_or(SessionError::NotConnected)
    }

    /// Selects a folder and records its message count.
    ///
    /// The window is kept; call [`Self::load_messages`] to refresh it. A
    /// failed selection leaves no folder selected.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::FolderUnavailable`] if the store refuses the
    /// folder or the call fails.
    pub async fn select_folder(&mut self, name: &str) -> Result<u32, SessionError> {
        let result = self.store()?.select_folder(name).await;
        self.loaded = false;

        match result {
            Ok(total) => {
                info!(folder = name, total, "folder selected");
                self.folder = Some(name.to_string());
                self.total = total;
                Ok(total)
            }
            Err(source) => {
                warn!(folder = name, error = %source, "folder selection failed");
                self.folder = None;
                self.total = 0;
                Err(SessionError::FolderUnavailable {
                    folder: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Replaces the window with the `limit` most recent messages.
    ///
    /// Messages whose fetch fails are skipped; the rest keep their order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::LoadFailed`] if the identifier search fails
    /// or the folder is empty. The window is unchanged in that case.
    pub async fn load_messages(&mut self, limit: usize) -> Result<LoadReport, SessionError> {
        let ids = self
            .store()?
            .search(&SearchCriteria::All)
            .await
            .map_err(|e| SessionError::LoadFailed(e.to_string()))?;

        if ids.is_empty() {
            return Err(SessionError::LoadFailed("no messages found".to_string()));
        }

        let recent = &ids[ids.len().saturating_sub(limit)..];
        self.fetch_window(recent).await
    }

    /// Replaces the window with every message matching `term`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoMatches`] if nothing matches, or
    /// [`SessionError::LoadFailed`] if the search itself fails. The window is
    /// unchanged in both cases.
    pub async fn search(&mut self, term: &str) -> Result<LoadReport, SessionError> {
        let ids = self
            .store()?
            .search(&SearchCriteria::Text(term.to_string()))
            .await
            .map_err(|e| SessionError::LoadFailed(e.to_string()))?;

        if ids.is_empty() {
            return Err(SessionError::NoMatches(term.to_string()));
        }

        self.fetch_window(&ids).await
    }

    async fn fetch_window(&mut self, ids: &[MessageId]) -> Result<LoadReport, SessionError> {
        let store = self.store()?;
        let mut messages = Vec::with_capacity(ids.len());

        for id in ids {
            match store.fetch_raw(id).await {
                Ok(raw) => messages.push(parse_summary(raw, id.clone())),
                Err(e) => warn!(%id, error = %e, "skipping message that failed to fetch"),
            }
        }

        let report = LoadReport {
            requested: ids.len(),
            loaded: messages.len(),
            failed: ids.len() - messages.len(),
        };
        info!(
            requested = report.requested,
            loaded = report.loaded,
            failed = report.failed,
            "window loaded"
        );

        self.messages = messages;
        self.cursor = 0;
        self.loaded = self.folder.is_some();
        Ok(report)
    }

    /// The message under the cursor with its body resolved.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyWindow`] if nothing is loaded.
    pub fn view_current(&self) -> Result<&MessageSummary, SessionError> {
        let summary = self.current().ok_or(SessionError::EmptyWindow)?;
        if !summary.is_resolved() {
            debug!(id = %summary.id, "resolving message body");
        }
        summary.resolve_body();
        Ok(summary)
    }

    /// Moves to the next message. Returns false at the end of the window.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.messages.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Moves to the previous message. Returns false at the start of the window.
    pub fn previous(&mut self) -> bool {
        if self.cursor > 0 && !self.messages.is_empty() {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Folder names in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn list_folders(&mut self) -> Result<Vec<String>, SessionError> {
        Ok(self.store()?.list_folders().await?)
    }

    /// Closes the folder and logs out, ignoring failures.
    ///
    /// Safe to call more than once.
    pub async fn disconnect(&mut self) {
        let Some(mut store) = self.store.take() else {
            return;
        };

        if self.folder.is_some()
            && let Err(e) = store.close().await
        {
            debug!(error = %e, "close failed during disconnect");
        }
        if let Err(e) = store.logout().await {
            debug!(error = %e, "logout failed during disconnect");
        }

        self.folder = None;
        self.total = 0;
        self.messages.clear();
        self.cursor = 0;
        self.loaded = false;
        info!("session disconnected");
    }
}
