//! The interactive command loop.

use anyhow::Result;
use mailfox_core::{
    AccountBook, AccountProfile, ExportFormat, Exporter, ImapStore, MailboxSession, Security,
    Settings, StepOutcome,
};
use tracing::{info, warn};

use crate::accounts;
use crate::prompt::{self, Prompt};
use crate::render;

/// One shell command, keyed by its letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    View,
    List,
    Reload,
    Folder,
    Search,
    Export,
    Compose,
    Account,
    Help,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        let command = match input.trim().to_ascii_lowercase().as_str() {
            "n" => Self::Next,
            "p" => Self::Previous,
            "v" => Self::View,
            "l" => Self::List,
            "r" => Self::Reload,
            "f" => Self::Folder,
            "s" => Self::Search,
            "e" => Self::Export,
            "c" => Self::Compose,
            "a" => Self::Account,
            "h" => Self::Help,
            "q" => Self::Quit,
            _ => return None,
        };
        Some(command)
    }
}

/// Whether the loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Shell state: the live session plus what is needed to rebuild it.
pub struct Shell {
    prompt: Prompt,
    settings: Settings,
    book: AccountBook,
    security: Security,
    limit: usize,
    exporter: Exporter,
    account: AccountProfile,
    session: MailboxSession<ImapStore>,
}

impl Shell {
    /// Connects `account`, selects a preferred folder and loads the window.
    pub async fn open(
        prompt: Prompt,
        settings: Settings,
        book: AccountBook,
        security: Security,
        limit: usize,
        exporter: Exporter,
        account: AccountProfile,
    ) -> Result<Self> {
        let session = connect(&account, security, &settings, limit).await?;
        Ok(Self {
            prompt,
            settings,
            book,
            security,
            limit,
            exporter,
            account,
            session,
        })
    }

    /// Runs commands until `q` or end of input, then disconnects.
    pub async fn run(mut self) -> Result<()> {
        self.show_list();
        let result = self.command_loop().await;
        self.session.disconnect().await;
        println!("Disconnected from the server");
        result
    }

    async fn command_loop(&mut self) -> Result<()> {
        loop {
            let Some(input) = self.prompt.ask("\nEnter command (h for help): ").await? else {
                return Ok(());
            };
            let Some(command) = Command::parse(&input) else {
                println!("Unknown command. Type 'h' for help.");
                continue;
            };
            if self.execute(command).await? == Flow::Quit {
                return Ok(());
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => println!("{}", render::HELP),
            Command::List => self.show_list(),
            Command::Next => {
                if self.session.next() {
                    self.show_list();
                } else {
                    println!("Already at the last message");
                }
            }
            Command::Previous => {
                if self.session.previous() {
                    self.show_list();
                } else {
                    println!("Already at the first message");
                }
            }
            Command::View => self.view().await?,
            Command::Reload => {
                load(&mut self.session, self.limit).await;
                self.show_list();
            }
            Command::Folder => self.choose_folder().await?,
            Command::Search => self.search().await?,
            Command::Export => self.export().await?,
            Command::Compose => println!("Composing messages is not supported"),
            Command::Account => return self.switch_account().await,
        }
        Ok(Flow::Continue)
    }

    fn show_list(&self) {
        print!("{}", render::message_list(&self.session, &self.account.user));
        println!("{}", render::HELP);
    }

    async fn view(&mut self) -> Result<()> {
        match self.session.view_current() {
            Ok(summary) => {
                let total = self.session.messages().len();
                print!("{}", render::message_view(self.session.cursor() + 1, total, summary));
                self.prompt.pause().await?;
                self.show_list();
            }
            Err(e) => println!("{e}"),
        }
        Ok(())
    }

    async fn choose_folder(&mut self) -> Result<()> {
        let folders = match self.session.list_folders().await {
            Ok(folders) if !folders.is_empty() => folders,
            Ok(_) => {
                println!("No folders available");
                return Ok(());
            }
            Err(e) => {
                println!("Could not list folders: {e}");
                return Ok(());
            }
        };

        println!("\nAvailable folders:");
        for (i, folder) in folders.iter().enumerate() {
            println!("{}. {folder}", i + 1);
        }

        let answer = self.prompt.ask("\nSelect folder number: ").await?;
        let folder = answer
            .and_then(|a| a.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| folders.get(i));
        let Some(folder) = folder else {
            println!("Invalid folder selection");
            return Ok(());
        };

        match self.session.select_folder(folder).await {
            Ok(_) => {
                load(&mut self.session, self.limit).await;
                self.show_list();
            }
            Err(e) => println!("{e}"),
        }
        Ok(())
    }

    async fn search(&mut self) -> Result<()> {
        let term = self.prompt.ask("Enter search term: ").await?;
        let Some(term) = term.filter(|t| !t.is_empty()) else {
            return Ok(());
        };

        match self.session.search(&term).await {
            Ok(report) => {
                println!("Found {} messages matching {term:?}", report.loaded);
                self.show_list();
            }
            Err(e) => println!("{e}"),
        }
        Ok(())
    }

    async fn export(&mut self) -> Result<()> {
        let Some(summary) = self.session.current() else {
            println!("No message selected to export");
            return Ok(());
        };

        println!("\nExport options:");
        println!("1. Text file (.txt)");
        println!("2. HTML file (.html)");
        println!("3. Full email with attachments (.eml)");
        println!("4. All formats");
        let choice = self.prompt.ask("\nSelect export format (1-4): ").await?;
        let Some(format) = choice.as_deref().and_then(ExportFormat::from_choice) else {
            println!("Invalid export format");
            return Ok(());
        };

        let report = self.exporter.export(summary, format);
        for (kind, outcome) in &report.steps {
            match outcome {
                StepOutcome::Written(artifacts) if artifacts.is_empty() => {
                    println!("No {kind} files to write");
                }
                StepOutcome::Written(artifacts) => {
                    for artifact in artifacts {
                        println!("Exported {kind}: {}", artifact.path.display());
                    }
                }
                StepOutcome::Partial { written, failed } => {
                    for artifact in written {
                        println!("Exported {kind}: {}", artifact.path.display());
                    }
                    for e in failed {
                        println!("Error exporting {kind}: {e}");
                    }
                }
                StepOutcome::NoHtml => println!("No HTML content found in this email"),
                StepOutcome::Failed(e) => println!("Error exporting {kind}: {e}"),
            }
        }
        if report.is_success() {
            println!("Export completed to {}", self.exporter.root().display());
        }
        self.prompt.pause().await?;
        self.show_list();
        Ok(())
    }

    async fn switch_account(&mut self) -> Result<Flow> {
        println!("\nChanging email account...");
        self.session.disconnect().await;

        let account =
            match accounts::choose(&self.settings, &self.book, &mut self.prompt, self.security)
                .await
            {
                Ok(account) => account,
                Err(e) => {
                    println!("{e:#}. Exiting...");
                    return Ok(Flow::Quit);
                }
            };

        match connect(&account, self.security, &self.settings, self.limit).await {
            Ok(session) => {
                self.session = session;
                self.account = account;
                self.show_list();
                Ok(Flow::Continue)
            }
            Err(e) => {
                println!("Failed to connect with new settings: {e:#}. Exiting...");
                Ok(Flow::Quit)
            }
        }
    }
}

/// Connects, selects the first preferred folder that works and loads it.
///
/// A session that connected but has no usable folder is disconnected
/// before the error is returned.
async fn connect(
    account: &AccountProfile,
    security: Security,
    settings: &Settings,
    limit: usize,
) -> Result<MailboxSession<ImapStore>> {
    let secret = prompt::password(&account.user)?;
    let params = account.connect_params(secret, security);

    println!("Connecting to {}:{}...", account.server, account.port);
    let mut session = MailboxSession::<ImapStore>::connect(&params).await?;
    println!("Connected to {}", account.server);

    let mut selected = false;
    for folder in &settings.preferred_folders {
        match session.select_folder(folder).await {
            Ok(total) => {
                println!("Selected folder {folder}: {total} messages");
                selected = true;
                break;
            }
            Err(e) => warn!(folder = %folder, error = %e, "preferred folder unavailable"),
        }
    }
    if !selected {
        session.disconnect().await;
        anyhow::bail!("could not select any of {:?}", settings.preferred_folders);
    }

    load(&mut session, limit).await;
    Ok(session)
}

async fn load(session: &mut MailboxSession<ImapStore>, limit: usize) {
    println!("Loading the {limit} most recent messages...");
    match session.load_messages(limit).await {
        Ok(report) => {
            info!(loaded = report.loaded, failed = report.failed, "messages loaded");
            if report.failed > 0 {
                println!("Loaded {} messages, {} could not be fetched", report.loaded, report.failed);
            }
        }
        Err(e) => println!("{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("n"), Some(Command::Next));
        assert_eq!(Command::parse(" Q \n"), Some(Command::Quit));
        assert_eq!(Command::parse("e"), Some(Command::Export));
        assert_eq!(Command::parse("a"), Some(Command::Account));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("next"), None);
        assert_eq!(Command::parse("x"), None);
    }
}
