//! `leadsync` — normalize, score, and deduplicate GTM leads into a CRM.
//!
//! # Usage
//!
//! ```text
//! leadsync import --companies accounts.csv --contacts people.csv --source "Deep Research"
//! leadsync import --contacts export.json --dry-run --json
//! leadsync classify "VP of Engineering" --tier "Tier 1"
//! leadsync pending-urls profiles.txt
//! ```
//!
//! Settings come from `leadsync.toml` (or `--config`), overridden by
//! `LEADSYNC_*` environment variables. Logs go to stderr; the summary goes to
//! stdout.

mod commands;
mod settings;
mod webhook;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{ClassifyArgs, ImportArgs, PendingUrlsArgs};
use settings::{Destination, Settings};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "leadsync", version, about = "Lead ingestion and scoring pipeline")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "leadsync.toml")]
  config: PathBuf,

  /// Override the configured destination store.
  #[arg(long, global = true, value_enum)]
  destination: Option<Destination>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Read input files and sync them into the destination.
  Import(ImportArgs),
  /// Show how a job title is classified and scored.
  Classify(ClassifyArgs),
  /// Print profile URLs from a list that no stored contact has yet.
  PendingUrls(PendingUrlsArgs),
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if let Command::Classify(args) = &cli.command {
    return commands::classify(args);
  }

  let mut settings = Settings::load(&cli.config)?;
  if let Some(destination) = cli.destination {
    settings.destination = destination;
  }
  settings.validate()?;

  match cli.command {
    Command::Import(args) => commands::import(&settings, args).await,
    Command::PendingUrls(args) => commands::pending_urls(&settings, &args).await,
    Command::Classify(_) => Ok(ExitCode::SUCCESS),
  }
}
