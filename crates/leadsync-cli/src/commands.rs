//! Subcommand implementations.

use std::{collections::HashSet, path::PathBuf, process::ExitCode};

use anyhow::{Context as _, Result, anyhow, bail};
use leadsync_core::{
  classify::classify_title,
  context::{RunContext, RunReport},
  model::{Contact, IngestionBatch, PriorityTier, Stored},
  pipeline,
  store::DestinationStore,
};
use leadsync_hubspot::{HubSpotConfig, HubSpotStore};
use leadsync_ingest::{RecordKind, load_file, load_url_list};
use leadsync_store_sqlite::SqliteStore;
use tracing::info;

use crate::{
  settings::{Destination, Settings},
  webhook::WebhookNotifier,
};

// ─── import ──────────────────────────────────────────────────────────────────

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
  /// Company input file (CSV or JSON). May be repeated.
  #[arg(long = "companies", value_name = "FILE")]
  pub companies: Vec<PathBuf>,

  /// Contact input file (CSV or JSON). May be repeated.
  #[arg(long = "contacts", value_name = "FILE")]
  pub contacts: Vec<PathBuf>,

  /// Provenance tag for records that carry none.
  #[arg(long)]
  pub source: Option<String>,

  /// Records per bulk-write call (1-100).
  #[arg(long)]
  pub chunk_size: Option<usize>,

  /// Plan and report without writing or notifying.
  #[arg(long)]
  pub dry_run: bool,

  /// Print the run report as JSON.
  #[arg(long)]
  pub json: bool,
}

pub async fn import(settings: &Settings, args: ImportArgs) -> Result<ExitCode> {
  if args.companies.is_empty() && args.contacts.is_empty() {
    bail!("nothing to import: pass --companies and/or --contacts");
  }

  let mut config = settings.pipeline_config()?;
  if let Some(chunk_size) = args.chunk_size {
    config.chunk_size = chunk_size;
  }
  config.dry_run = args.dry_run;
  let mut ctx = RunContext::new(config).context("invalid pipeline configuration")?;

  let mut batch = IngestionBatch {
    source: args.source.clone(),
    ..IngestionBatch::default()
  };
  let inputs = args
    .companies
    .iter()
    .map(|p| (p, RecordKind::Company))
    .chain(args.contacts.iter().map(|p| (p, RecordKind::Contact)));
  for (path, kind) in inputs {
    let loaded = load_file(&mut ctx, path, kind)
      .with_context(|| format!("failed to read {}", path.display()))?;
    batch.companies.extend(loaded.companies);
    batch.contacts.extend(loaded.contacts);
  }
  info!(
    companies = batch.companies.len(),
    contacts = batch.contacts.len(),
    dropped = ctx.report().dropped,
    "inputs read"
  );

  let notifier = match settings.notify.webhook_url.as_deref() {
    Some(url) => Some(
      WebhookNotifier::new(url, settings.call_timeout()).context("failed to build webhook client")?,
    ),
    None => None,
  };

  let report = match settings.destination {
    Destination::Sqlite => {
      let store = open_sqlite_for_import(settings, args.dry_run).await?;
      if let Some(at) = store.last_updated().await.context("failed to read store")? {
        info!(last_updated = %at.format("%Y-%m-%d %H:%M:%S UTC"), "existing store");
      }
      run(ctx, &store, notifier.as_ref(), batch).await?
    }
    Destination::Hubspot => {
      let store = open_hubspot(settings)?;
      run(ctx, &store, notifier.as_ref(), batch).await?
    }
  };

  if args.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print!("{report}");
  }
  Ok(ExitCode::from(report.exit_code() as u8))
}

async fn run<S: DestinationStore>(
  ctx: RunContext,
  store: &S,
  notifier: Option<&WebhookNotifier>,
  batch: IngestionBatch,
) -> Result<RunReport> {
  pipeline::run(ctx, store, notifier, batch)
    .await
    .context("pipeline aborted")
}

/// A dry run against a database that does not exist yet plans against an
/// empty in-memory store, leaving the path untouched.
async fn open_sqlite_for_import(settings: &Settings, dry_run: bool) -> Result<SqliteStore> {
  let path = settings.sqlite_path();
  if dry_run && !path.exists() {
    info!(path = %path.display(), "no database yet; dry run starts from an empty snapshot");
    return SqliteStore::open_in_memory()
      .await
      .context("failed to open in-memory store");
  }
  open_sqlite(settings).await
}

async fn open_sqlite(settings: &Settings) -> Result<SqliteStore> {
  let path = settings.sqlite_path();
  SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

fn open_hubspot(settings: &Settings) -> Result<HubSpotStore> {
  let token = settings
    .hubspot_token()
    .ok_or_else(|| anyhow!("hubspot.token is not set"))?;
  HubSpotStore::new(HubSpotConfig {
    base_url: settings.hubspot.base_url.clone(),
    token:    token.to_owned(),
    timeout:  settings.call_timeout(),
  })
  .context("failed to build HubSpot client")
}

// ─── classify ────────────────────────────────────────────────────────────────

#[derive(clap::Args, Debug)]
pub struct ClassifyArgs {
  /// Job title to classify.
  pub title: String,

  /// Owning company's priority tier (e.g. "Tier 1", "T2", "customer").
  #[arg(long)]
  pub tier: Option<String>,
}

pub fn classify(args: &ClassifyArgs) -> Result<ExitCode> {
  let tier = match args.tier.as_deref() {
    Some(raw) => Some(
      PriorityTier::parse_loose(raw).ok_or_else(|| anyhow!("unrecognised tier {raw:?}"))?,
    ),
    None => None,
  };

  let c = classify_title(Some(&args.title), tier);
  println!("level:    {}", c.job_level);
  println!("function: {}", c.job_function);
  println!("role:     {}", c.role_type);
  println!("score:    {}", c.persona_score);
  Ok(ExitCode::SUCCESS)
}

// ─── pending-urls ────────────────────────────────────────────────────────────

#[derive(clap::Args, Debug)]
pub struct PendingUrlsArgs {
  /// Line-delimited list of profile URLs.
  pub file: PathBuf,
}

pub async fn pending_urls(settings: &Settings, args: &PendingUrlsArgs) -> Result<ExitCode> {
  let urls = load_url_list(&args.file)
    .with_context(|| format!("failed to read {}", args.file.display()))?;

  let timeout = settings.call_timeout();
  let stored = match settings.destination {
    Destination::Sqlite => {
      let store = open_sqlite(settings).await?;
      list_contacts(&store, timeout).await?
    }
    Destination::Hubspot => list_contacts(&open_hubspot(settings)?, timeout).await?,
  };

  let pending = filter_pending(urls, &stored);
  info!(pending = pending.len(), stored = stored.len(), "compared url list");
  for url in pending {
    println!("{url}");
  }
  Ok(ExitCode::SUCCESS)
}

async fn list_contacts<S: DestinationStore>(
  store: &S,
  timeout: std::time::Duration,
) -> Result<Vec<Stored<Contact>>> {
  tokio::time::timeout(timeout, store.list_contacts())
    .await
    .map_err(|_| anyhow!("listing contacts timed out after {}s", timeout.as_secs()))?
    .context("failed to list contacts")
}

fn url_key(url: &str) -> String { url.trim().trim_end_matches('/').to_lowercase() }

/// URLs not yet held by any stored contact, in input order, each at most once.
fn filter_pending(urls: Vec<String>, stored: &[Stored<Contact>]) -> Vec<String> {
  let mut seen: HashSet<String> = stored
    .iter()
    .filter_map(|s| s.record.linkedin_url.as_deref())
    .map(url_key)
    .collect();

  urls
    .into_iter()
    .filter(|url| seen.insert(url_key(url)))
    .collect()
}

#[cfg(test)]
mod tests {
  use leadsync_core::model::RecordId;

  use super::*;

  fn stored_with_url(url: &str) -> Stored<Contact> {
    Stored {
      id:     RecordId::new("1"),
      record: Contact {
        linkedin_url: Some(url.into()),
        ..Contact::new("Jane Doe", "Acme")
      },
    }
  }

  #[test]
  fn pending_skips_known_and_repeated_urls() {
    let stored = vec![stored_with_url("https://www.linkedin.com/in/jane-doe")];
    let urls = vec![
      "https://www.linkedin.com/in/bob/".to_string(),
      "https://www.LinkedIn.com/in/jane-doe/".to_string(),
      "https://www.linkedin.com/in/carol".to_string(),
      "https://www.linkedin.com/in/bob".to_string(),
    ];

    assert_eq!(filter_pending(urls, &stored), vec![
      "https://www.linkedin.com/in/bob/",
      "https://www.linkedin.com/in/carol",
    ]);
  }

  fn scratch_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("leadsync-dry-run-{}.db", std::process::id()))
  }

  #[tokio::test]
  async fn dry_run_leaves_missing_database_uncreated() {
    let path = scratch_db_path();
    let _ = std::fs::remove_file(&path);
    let mut settings = Settings::default();
    settings.sqlite.path = path.clone();

    let store = open_sqlite_for_import(&settings, true).await.unwrap();
    assert!(store.list_companies().await.unwrap().is_empty());
    assert!(!path.exists());
  }

  #[tokio::test]
  async fn real_import_creates_database() {
    let path = scratch_db_path().with_extension("real.db");
    let _ = std::fs::remove_file(&path);
    let mut settings = Settings::default();
    settings.sqlite.path = path.clone();

    open_sqlite_for_import(&settings, false).await.unwrap();
    assert!(path.exists());
    let _ = std::fs::remove_file(&path);
  }

  #[test]
  fn classify_rejects_unknown_tier() {
    let args = ClassifyArgs {
      title: "VP of Engineering".into(),
      tier:  Some("platinum".into()),
    };
    assert!(classify(&args).is_err());
  }
}
