//! Choosing the account to connect with.

use anyhow::{Context, Result, bail};
use mailfox_core::{AccountBook, AccountProfile, Security, Settings};

use crate::cli::Args;
use crate::prompt::Prompt;

/// Name given to an account built from command-line flags.
const ADHOC_ACCOUNT: &str = "command-line";

/// Picks the startup account: `--account`, then `--server`/`--user`, then
/// an interactive choice from the book.
pub async fn initial(
    args: &Args,
    settings: &Settings,
    book: &AccountBook,
    prompt: &mut Prompt,
) -> Result<AccountProfile> {
    let security = args.security();

    let mut profile = if let Some(name) = &args.account {
        book.find(name)
            .with_context(|| format!("cannot use account {name:?}"))?
    } else if let (Some(server), Some(user)) = (&args.server, &args.user) {
        AccountProfile::new(ADHOC_ACCOUNT, server, security.default_port(), user)
    } else {
        return choose(settings, book, prompt, security).await;
    };

    if let Some(port) = args.port {
        profile.port = port;
    }
    Ok(profile)
}

/// Lists saved accounts and lets the user pick one or enter a new one.
pub async fn choose(
    settings: &Settings,
    book: &AccountBook,
    prompt: &mut Prompt,
    security: Security,
) -> Result<AccountProfile> {
    let saved = match book.load() {
        Ok(saved) => saved,
        Err(e) => {
            tracing::warn!(error = %e, "could not read account book");
            Vec::new()
        }
    };

    if !saved.is_empty() {
        println!("\nSaved accounts:");
        for (i, profile) in saved.iter().enumerate() {
            println!("{}. {profile}", i + 1);
        }
        println!("{}. Enter new settings", saved.len() + 1);

        let Some(answer) = prompt.ask("\nSelect an option: ").await? else {
            bail!("no account selected");
        };
        match answer.parse::<usize>() {
            Ok(n) if (1..=saved.len()).contains(&n) => return Ok(saved[n - 1].clone()),
            Ok(n) if n == saved.len() + 1 => {}
            _ => bail!("invalid account choice {answer:?}"),
        }
    }

    enter_new(settings, book, prompt, security).await
}

async fn enter_new(
    settings: &Settings,
    book: &AccountBook,
    prompt: &mut Prompt,
    security: Security,
) -> Result<AccountProfile> {
    println!("\nEnter connection details (press Enter to use the default):");
    let server = prompt.ask_or("IMAP server", &settings.default_server).await?;

    let default_port = match security {
        Security::Tls => settings.default_port,
        Security::Plain => security.default_port(),
    };
    let port_answer = prompt.ask_or("IMAP port", &default_port.to_string()).await?;
    let port = port_answer.parse().unwrap_or_else(|_| {
        println!("Invalid port number, using {default_port}");
        default_port
    });

    let Some(user) = prompt.ask("Username: ").await?.filter(|u| !u.is_empty()) else {
        bail!("a username is required");
    };

    let mut profile = AccountProfile::new(ADHOC_ACCOUNT, server, port, user);

    let save = prompt.ask("Save these settings for future use? (y/n): ").await?;
    if save.is_some_and(|s| s.eq_ignore_ascii_case("y")) {
        match prompt.ask("Account name: ").await? {
            Some(name) if !name.is_empty() => {
                profile.name = name;
                match book.append(&profile) {
                    Ok(()) => println!("Account '{}' saved", profile.name),
                    Err(e) => println!("Could not save account: {e}"),
                }
            }
            _ => println!("No name given, account not saved"),
        }
    }

    Ok(profile)
}
