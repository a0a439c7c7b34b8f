//! Per-invocation state: configuration, in-run seen keys, counters, and the
//! events to emit once the pipeline has finished.
//!
//! A [`RunContext`] is built once per run, threaded through every stage, and
//! turned into a [`RunReport`] at the end. Nothing here is global.

use std::{collections::HashSet, fmt, time::Duration};

use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::{
  Error, Result,
  model::{CompanyKey, ContactKey, PriorityTier},
  normalize::AliasTable,
  source::SourcePriority,
};

/// Largest chunk accepted by the CRM batch endpoints.
pub const MAX_CHUNK_SIZE: usize = 100;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Tunables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  /// Records per bulk-write call.
  pub chunk_size:             usize,
  /// Upper bound on every external call.
  pub call_timeout:           Duration,
  pub source_priority:        SourcePriority,
  /// Inserted contacts scoring at least this much raise an event.
  pub notify_score_threshold: u8,
  pub aliases:                AliasTable,
  /// Plan and report without writing or notifying.
  pub dry_run:                bool,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      chunk_size:             25,
      call_timeout:           Duration::from_secs(30),
      source_priority:        SourcePriority::default(),
      notify_score_threshold: 80,
      aliases:                AliasTable::default(),
      dry_run:                false,
    }
  }
}

impl PipelineConfig {
  pub fn validate(&self) -> Result<()> {
    if !(1..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
      return Err(Error::Config(format!(
        "chunk_size must be between 1 and {MAX_CHUNK_SIZE}, got {}",
        self.chunk_size
      )));
    }
    if self.call_timeout.is_zero() {
      return Err(Error::Config("timeout must be greater than zero".into()));
    }
    if self.notify_score_threshold > crate::classify::MAX_SCORE {
      return Err(Error::Config(format!(
        "notify_score_threshold must be at most {}, got {}",
        crate::classify::MAX_SCORE,
        self.notify_score_threshold
      )));
    }
    Ok(())
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Which entity a write concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  Company,
  Contact,
}

/// Which bulk-write operation a chunk was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WriteOp {
  Create,
  Update,
}

/// A bulk-write chunk that failed or timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
  pub entity:    EntityKind,
  pub operation: WriteOp,
  /// Zero-based chunk index within its operation.
  pub index:     usize,
  pub records:   usize,
  pub error:     String,
}

/// Per-entity outcome counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
  pub inserted: usize,
  pub updated:  usize,
  pub skipped:  usize,
  /// Contacts whose owning company could not be resolved.
  pub orphaned: usize,
  /// Records in failed chunks.
  pub failed:   usize,
}

/// The summary every run produces, whether or not some chunks failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
  pub companies:            EntityCounts,
  pub contacts:             EntityCounts,
  /// Input rows excluded before dedup (malformed or missing names).
  pub dropped:              usize,
  pub failed_chunks:        Vec<ChunkFailure>,
  pub notifications_sent:   usize,
  pub notifications_failed: usize,
  pub dry_run:              bool,
}

impl RunReport {
  pub fn counts_mut(&mut self, entity: EntityKind) -> &mut EntityCounts {
    match entity {
      EntityKind::Company => &mut self.companies,
      EntityKind::Contact => &mut self.contacts,
    }
  }

  /// A failed chunk is the only condition that makes a run unsuccessful.
  pub fn is_success(&self) -> bool { self.failed_chunks.is_empty() }

  pub fn exit_code(&self) -> i32 { if self.is_success() { 0 } else { 1 } }
}

impl fmt::Display for RunReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.dry_run {
      writeln!(f, "dry run: nothing was written")?;
    }
    writeln!(
      f,
      "{:<10} {:>9} {:>8} {:>8} {:>9} {:>7}",
      "", "inserted", "updated", "skipped", "orphaned", "failed"
    )?;
    for (label, c) in [("companies", &self.companies), ("contacts", &self.contacts)] {
      writeln!(
        f,
        "{:<10} {:>9} {:>8} {:>8} {:>9} {:>7}",
        label, c.inserted, c.updated, c.skipped, c.orphaned, c.failed
      )?;
    }
    writeln!(f, "dropped rows: {}", self.dropped)?;
    writeln!(
      f,
      "notifications: {} sent, {} failed",
      self.notifications_sent, self.notifications_failed
    )?;
    writeln!(f, "failed chunks: {}", self.failed_chunks.len())?;
    for chunk in &self.failed_chunks {
      writeln!(
        f,
        "  {} {} chunk #{} ({} records): {}",
        chunk.entity, chunk.operation, chunk.index, chunk.records, chunk.error
      )?;
    }
    Ok(())
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// A significant outcome worth telling humans about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunEvent {
  HighPriorityContact {
    name:          String,
    company:       String,
    title:         Option<String>,
    persona_score: u8,
  },
  PriorityCompany {
    name: String,
    tier: PriorityTier,
  },
}

impl RunEvent {
  /// One-line human-readable message.
  pub fn message(&self) -> String {
    match self {
      Self::HighPriorityContact {
        name,
        company,
        title,
        persona_score,
      } => match title {
        Some(t) => format!(
          "New high-priority contact: {name} ({t}) at {company}, persona score {persona_score}"
        ),
        None => format!(
          "New high-priority contact: {name} at {company}, persona score {persona_score}"
        ),
      },
      Self::PriorityCompany { name, tier } => {
        format!("New {tier} company: {name}")
      }
    }
  }
}

// ─── Run context ─────────────────────────────────────────────────────────────

/// State owned by a single run.
#[derive(Debug)]
pub struct RunContext {
  config:         PipelineConfig,
  seen_companies: HashSet<CompanyKey>,
  seen_contacts:  HashSet<ContactKey>,
  report:         RunReport,
  events:         Vec<RunEvent>,
}

impl RunContext {
  /// Validate `config` and start a fresh run.
  pub fn new(config: PipelineConfig) -> Result<Self> {
    config.validate()?;
    let report = RunReport {
      dry_run: config.dry_run,
      ..RunReport::default()
    };
    Ok(Self {
      config,
      seen_companies: HashSet::new(),
      seen_contacts: HashSet::new(),
      report,
      events: Vec::new(),
    })
  }

  pub fn config(&self) -> &PipelineConfig { &self.config }

  pub fn report(&self) -> &RunReport { &self.report }

  pub fn report_mut(&mut self) -> &mut RunReport { &mut self.report }

  /// Count an input row excluded before dedup.
  pub fn record_dropped(&mut self, reason: &str) {
    tracing::warn!(reason, "dropping input row");
    self.report.dropped += 1;
  }

  /// Mark a company key as handled in this run. Returns `false` when an
  /// earlier candidate in the run already claimed it.
  pub fn claim_company(&mut self, key: &CompanyKey) -> bool {
    self.seen_companies.insert(key.clone())
  }

  /// Contact counterpart of [`Self::claim_company`].
  pub fn claim_contact(&mut self, key: &ContactKey) -> bool {
    self.seen_contacts.insert(key.clone())
  }

  pub fn emit(&mut self, event: RunEvent) { self.events.push(event); }

  /// Drain events collected so far.
  pub fn take_events(&mut self) -> Vec<RunEvent> { std::mem::take(&mut self.events) }

  pub fn into_report(self) -> RunReport { self.report }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_is_valid() {
    assert!(RunContext::new(PipelineConfig::default()).is_ok());
  }

  #[test]
  fn chunk_size_out_of_range_is_a_config_error() {
    for chunk_size in [0, MAX_CHUNK_SIZE + 1] {
      let config = PipelineConfig {
        chunk_size,
        ..PipelineConfig::default()
      };
      assert!(matches!(RunContext::new(config), Err(Error::Config(_))));
    }
  }

  #[test]
  fn zero_timeout_is_a_config_error() {
    let config = PipelineConfig {
      call_timeout: Duration::ZERO,
      ..PipelineConfig::default()
    };
    assert!(matches!(config.validate(), Err(Error::Config(_))));
  }

  #[test]
  fn claims_are_first_come() {
    let mut ctx = RunContext::new(PipelineConfig::default()).unwrap();
    let key = CompanyKey::new("Acme Inc");
    assert!(ctx.claim_company(&key));
    assert!(!ctx.claim_company(&CompanyKey::new("ACME INC")));
  }

  #[test]
  fn exit_code_reflects_failed_chunks_only() {
    let mut report = RunReport::default();
    report.contacts.orphaned = 3;
    report.dropped = 2;
    assert_eq!(report.exit_code(), 0);

    report.failed_chunks.push(ChunkFailure {
      entity:    EntityKind::Contact,
      operation: WriteOp::Create,
      index:     0,
      records:   25,
      error:     "timeout".into(),
    });
    assert_eq!(report.exit_code(), 1);
  }

  #[test]
  fn event_messages() {
    let event = RunEvent::HighPriorityContact {
      name:          "Jane Doe".into(),
      company:       "Acme Inc".into(),
      title:         Some("VP of Engineering".into()),
      persona_score: 85,
    };
    assert_eq!(
      event.message(),
      "New high-priority contact: Jane Doe (VP of Engineering) at Acme Inc, persona score 85"
    );

    let event = RunEvent::PriorityCompany {
      name: "Acme Inc".into(),
      tier: PriorityTier::Tier1,
    };
    assert_eq!(event.message(), "New Tier1 company: Acme Inc");
  }
}
