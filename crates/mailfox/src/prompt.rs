//! Line input from the terminal.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Environment variable consulted before prompting for a password.
pub const PASSWORD_ENV: &str = "MAILFOX_PASSWORD";

/// Reads answers from stdin, one line per question.
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Prints `question` and reads one trimmed line; `None` at end of input.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        print!("{question}");
        std::io::stdout().flush()?;
        let line = self.lines.next_line().await?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    /// Like [`Self::ask`], falling back to `default` on an empty answer.
    pub async fn ask_or(&mut self, question: &str, default: &str) -> Result<String> {
        let answer = self.ask(&format!("{question} [{default}]: ")).await?;
        Ok(match answer {
            Some(a) if !a.is_empty() => a,
            _ => default.to_string(),
        })
    }

    /// Waits for Enter.
    pub async fn pause(&mut self) -> Result<()> {
        self.ask("Press Enter to continue...").await?;
        Ok(())
    }
}

/// The password for `user`, from the environment or a hidden prompt.
pub fn password(user: &str) -> Result<String> {
    if let Ok(secret) = std::env::var(PASSWORD_ENV) {
        return Ok(secret);
    }
    rpassword::prompt_password(format!("Password for {user}: "))
        .context("failed to read password")
}
