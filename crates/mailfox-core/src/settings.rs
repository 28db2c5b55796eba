//! Persisted application settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Directory name under the platform config directory.
pub const APP_DIR: &str = "mailfox";

/// Settings file name inside the config directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// Returns `<platform config dir>/mailfox`, or `./mailfox` if the platform
/// has no config directory.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// User-tunable settings. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where exports are written.
    pub export_dir: PathBuf,
    /// How many recent messages a load fetches.
    pub load_limit: usize,
    /// Folders tried in order at startup.
    pub preferred_folders: Vec<String>,
    /// Server offered when configuring a new account.
    pub default_server: String,
    /// Port offered when configuring a new account.
    pub default_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("exported_emails"),
            load_limit: 20,
            preferred_folders: vec!["Sent".to_string(), "INBOX".to_string()],
            default_server: "imap.example.com".to_string(),
            default_port: 993,
        }
    }
}

impl Settings {
    /// Loads `settings.json` from `dir`; a missing file gives defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let settings = serde_json::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Writes `settings.json` into `dir`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(SETTINGS_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents).await?;

        tracing::info!("Settings saved to {:?}", path);
        Ok(())
    }
}
