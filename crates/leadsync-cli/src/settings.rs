//! Layered configuration: optional TOML file, then `LEADSYNC_*` environment
//! variables, then command-line overrides.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, Result, bail};
use leadsync_core::{context::PipelineConfig, normalize::AliasTable, source::SourcePriority};
use serde::Deserialize;

/// Where records are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
  #[default]
  Sqlite,
  Hubspot,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteSettings {
  pub path: PathBuf,
}

impl Default for SqliteSettings {
  fn default() -> Self { Self { path: PathBuf::from("leadsync.db") } }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubSpotSettings {
  pub base_url: String,
  pub token:    Option<String>,
}

impl Default for HubSpotSettings {
  fn default() -> Self {
    Self {
      base_url: leadsync_hubspot::DEFAULT_BASE_URL.to_string(),
      token:    None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
  pub chunk_size:             usize,
  pub timeout_secs:           u64,
  /// Highest priority first; empty keeps the built-in ranking.
  pub source_priority:        Vec<String>,
  pub notify_score_threshold: u8,
}

impl Default for PipelineSettings {
  fn default() -> Self {
    let defaults = PipelineConfig::default();
    Self {
      chunk_size:             defaults.chunk_size,
      timeout_secs:           defaults.call_timeout.as_secs(),
      source_priority:        Vec::new(),
      notify_score_threshold: defaults.notify_score_threshold,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
  pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub destination: Destination,
  pub sqlite:      SqliteSettings,
  pub hubspot:     HubSpotSettings,
  pub pipeline:    PipelineSettings,
  /// Extra header aliases keyed by canonical field name.
  pub aliases:     HashMap<String, Vec<String>>,
  pub notify:      NotifySettings,
}

impl Settings {
  /// Load `path` (if it exists) under `LEADSYNC_*` environment variables.
  ///
  /// Nested keys use a double underscore: `LEADSYNC_PIPELINE__CHUNK_SIZE=50`.
  pub fn load(path: &Path) -> Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("LEADSYNC")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("pipeline.source_priority"),
      )
      .build()
      .with_context(|| format!("failed to read config from {}", path.display()))?;

    raw
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  /// Checks that cannot wait until a destination is opened.
  pub fn validate(&self) -> Result<()> {
    if self.destination == Destination::Hubspot && self.hubspot_token().is_none() {
      bail!("hubspot.token is required when destination is \"hubspot\"");
    }
    if self
      .notify
      .webhook_url
      .as_deref()
      .is_some_and(|u| !u.starts_with("http://") && !u.starts_with("https://"))
    {
      bail!("notify.webhook_url must be an http(s) URL");
    }
    Ok(())
  }

  pub fn hubspot_token(&self) -> Option<&str> {
    self
      .hubspot
      .token
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
  }

  pub fn sqlite_path(&self) -> PathBuf { expand_tilde(&self.sqlite.path) }

  pub fn call_timeout(&self) -> Duration { Duration::from_secs(self.pipeline.timeout_secs) }

  /// The core pipeline configuration. Range checks happen when the run
  /// context is created.
  pub fn pipeline_config(&self) -> Result<PipelineConfig> {
    let aliases = AliasTable::with_extra(&self.aliases).context("invalid [aliases] table")?;
    let source_priority = if self.pipeline.source_priority.is_empty() {
      SourcePriority::default()
    } else {
      SourcePriority::new(&self.pipeline.source_priority)
    };

    Ok(PipelineConfig {
      chunk_size: self.pipeline.chunk_size,
      call_timeout: self.call_timeout(),
      source_priority,
      notify_score_threshold: self.pipeline.notify_score_threshold,
      aliases,
      dry_run: false,
    })
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
