//! Flat-file account storage.
//!
//! Each record is four lines (name, server, port, user) followed by a
//! separator line of dashes:
//!
//! ```text
//! work
//! imap.work.example
//! 993
//! me@work.example
//! ------------------------------
//! ```

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::model::AccountProfile;
use crate::{Error, Result};

/// File name of the account book inside the configuration directory.
pub const ACCOUNTS_FILE: &str = "accounts.txt";

/// Line that ends every record.
pub const RECORD_SEPARATOR: &str = "------------------------------";

/// Account profiles stored in a text file.
#[derive(Debug, Clone)]
pub struct AccountBook {
    path: PathBuf,
}

impl AccountBook {
    /// Uses the book at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `accounts.txt` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(ACCOUNTS_FILE))
    }

    /// The book file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every complete record in file order.
    ///
    /// A missing file is an empty book. Records with a bad port or the
    /// wrong number of lines are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(&self) -> Result<Vec<AccountProfile>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no account book yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut profiles = Vec::new();
        let mut record: Vec<&str> = Vec::new();

        for line in contents.lines().map(str::trim) {
            if line == RECORD_SEPARATOR {
                if let Some(profile) = parse_record(&record) {
                    profiles.push(profile);
                }
                record.clear();
            } else {
                record.push(line);
            }
        }

        // A final record without its separator still counts if complete.
        if record.len() == 4
            && let Some(profile) = parse_record(&record)
        {
            profiles.push(profile);
        }

        Ok(profiles)
    }

    /// Appends one record, creating the file and its directory as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a field contains a line break, or an
    /// I/O error if the file cannot be written.
    pub fn append(&self, profile: &AccountProfile) -> Result<()> {
        let fields = [
            profile.name.as_str(),
            profile.server.as_str(),
            profile.user.as_str(),
        ];
        if fields.iter().any(|f| f.contains(['\n', '\r'])) {
            return Err(Error::Config(
                "account fields cannot contain line breaks".to_string(),
            ));
        }

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        write!(
            file,
            "{}\n{}\n{}\n{}\n{RECORD_SEPARATOR}\n",
            profile.name, profile.server, profile.port, profile.user
        )?;

        debug!(name = %profile.name, path = %self.path.display(), "account saved");
        Ok(())
    }

    /// Finds a profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if no record has that name.
    pub fn find(&self, name: &str) -> Result<AccountProfile> {
        self.load()?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::AccountNotFound(name.to_string()))
    }
}

fn parse_record(lines: &[&str]) -> Option<AccountProfile> {
    let [name, server, port, user] = lines else {
        if !lines.is_empty() {
            warn!(lines = lines.len(), "skipping malformed account record");
        }
        return None;
    };

    match port.parse() {
        Ok(port) => Some(AccountProfile::new(*name, *server, port, *user)),
        Err(_) => {
            warn!(name = %name, port = %port, "skipping account with invalid port");
            None
        }
    }
}
