//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use mailfox_core::Security;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Saved account to connect with
    #[arg(short, long)]
    pub account: Option<String>,

    /// IMAP server host, used with --user instead of a saved account
    #[arg(long, requires = "user", conflicts_with = "account")]
    pub server: Option<String>,

    /// IMAP server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Login name, used with --server
    #[arg(short, long, requires = "server")]
    pub user: Option<String>,

    /// Connect over plain TCP instead of TLS
    #[arg(long)]
    pub insecure: bool,

    /// Number of recent messages to load
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Directory exports are written to
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Directory holding accounts.txt and settings.json
    #[arg(long, env = "MAILFOX_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    pub const fn security(&self) -> Security {
        if self.insecure {
            Security::Plain
        } else {
            Security::Tls
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["mailfox"]).unwrap();
        assert!(args.account.is_none());
        assert_eq!(args.security(), Security::Tls);
    }

    #[test]
    fn test_adhoc_server() {
        let args = Args::try_parse_from([
            "mailfox", "--server", "imap.example.com", "--user", "me", "--insecure", "-l", "5",
        ])
        .unwrap();
        assert_eq!(args.server.as_deref(), Some("imap.example.com"));
        assert_eq!(args.security(), Security::Plain);
        assert_eq!(args.limit, Some(5));
    }

    #[test]
    fn test_server_requires_user() {
        assert!(Args::try_parse_from(["mailfox", "--server", "imap.example.com"]).is_err());
    }

    #[test]
    fn test_account_conflicts_with_server() {
        assert!(
            Args::try_parse_from(["mailfox", "-a", "work", "--server", "x", "--user", "me"])
                .is_err()
        );
    }
}
