//! Account profile model.

use serde::{Deserialize, Serialize};

use crate::store::{ConnectParams, Security};

/// A named server and login, without the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Display name chosen by the user.
    pub name: String,
    /// Server host name.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Login name.
    pub user: String,
}

impl AccountProfile {
    /// Creates a profile.
    pub fn new(
        name: impl Into<String>,
        server: impl Into<String>,
        port: u16,
        user: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            port,
            user: user.into(),
        }
    }

    /// Connection parameters for this profile with the given secret.
    #[must_use]
    pub fn connect_params(&self, secret: String, security: Security) -> ConnectParams {
        ConnectParams {
            server: self.server.clone(),
            port: self.port,
            user: self.user.clone(),
            secret,
            security,
        }
    }
}

impl std::fmt::Display for AccountProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}@{}:{})", self.name, self.user, self.server, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_params_carry_secret_only_in_memory() {
        let profile = AccountProfile::new("work", "imap.work.example", 993, "me");
        let params = profile.connect_params("pw".into(), Security::Tls);
        assert_eq!(params.server, "imap.work.example");
        assert_eq!(params.secret, "pw");
        assert_eq!(profile.to_string(), "work (me@imap.work.example:993)");
    }
}
