//! mailfox - terminal mail explorer
//!
//! Connects to an IMAP account, pages through recent messages and exports
//! them as text, HTML or raw `.eml` with attachments.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod accounts;
mod cli;
mod prompt;
mod render;
mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use mailfox_core::{AccountBook, Exporter, Settings, default_config_dir};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Args;
use prompt::Prompt;
use shell::Shell;

const BANNER: &str = "mailfox - the terminal mail explorer";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailfox=info,mailfox_core=info,mailfox_imap=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    info!("Starting mailfox");

    let config_dir = args.config_dir.clone().unwrap_or_else(default_config_dir);
    let settings = Settings::load(&config_dir)
        .await
        .with_context(|| format!("failed to load settings from {}", config_dir.display()))?;
    let book = AccountBook::in_dir(&config_dir);

    println!("{BANNER}");
    let mut prompt = Prompt::stdin();
    let account = accounts::initial(&args, &settings, &book, &mut prompt).await?;

    let limit = args.limit.unwrap_or(settings.load_limit);
    let export_dir = args
        .export_dir
        .clone()
        .unwrap_or_else(|| settings.export_dir.clone());

    let shell = Shell::open(
        prompt,
        settings,
        book,
        args.security(),
        limit,
        Exporter::new(export_dir),
        account,
    )
    .await
    .context("could not open the mailbox")?;

    shell.run().await
}
