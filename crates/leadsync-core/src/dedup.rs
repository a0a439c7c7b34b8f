//! Deduplicator — partitions candidates into inserts, updates, and skips.
//!
//! Planning is pure with respect to the destination: it works from a snapshot
//! fetched once per run, plus the in-run claim sets held by [`RunContext`].
//!
//! For each candidate:
//!
//! 1. A key already claimed earlier in this run is skipped (first seen wins).
//! 2. A key absent from the snapshot is inserted.
//! 3. A key present in the snapshot is updated only if the candidate's source
//!    strictly outranks the stored source and the merge changes something;
//!    otherwise it is skipped.
//!
//! Contacts are additionally resolved against a [`CompanyDirectory`]; a
//! contact whose owning company is unknown is counted as orphaned and never
//! planned.

use std::{collections::HashMap, hash::Hash};

use tracing::{debug, warn};

use crate::{
  context::{EntityKind, RunContext},
  model::{
    Company, CompanyKey, Contact, ContactKey, PriorityTier, RecordId, Stored,
  },
  source::SourcePriority,
};

// ─── Candidate abstraction ───────────────────────────────────────────────────

/// What the planner needs to know about a record type.
pub trait Candidate: Clone + PartialEq {
  type Key: Eq + Hash + Clone + std::fmt::Debug;

  fn dedup_key(&self) -> Self::Key;
  fn source_tag(&self) -> Option<&str>;
  fn merge_over(&self, existing: &Self) -> Self;
}

impl Candidate for Company {
  type Key = CompanyKey;

  fn dedup_key(&self) -> CompanyKey { self.key() }

  fn source_tag(&self) -> Option<&str> { self.source.as_deref() }

  fn merge_over(&self, existing: &Self) -> Self { self.merged_over(existing) }
}

impl Candidate for Contact {
  type Key = ContactKey;

  fn dedup_key(&self) -> ContactKey { self.key() }

  fn source_tag(&self) -> Option<&str> { self.source.as_deref() }

  fn merge_over(&self, existing: &Self) -> Self { self.merged_over(existing) }
}

/// The outcome for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<T> {
  Insert(T),
  Update(Stored<T>),
  Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
  /// An earlier candidate in this run had the same key.
  DuplicateInRun,
  /// The stored record's source ranks at least as high.
  Outranked,
  /// The merge would not change the stored record.
  Unchanged,
}

/// Decide a single candidate. `finish` runs on a merged record before it is
/// compared with the stored one (contacts reclassify the merged title there).
pub fn decide<T: Candidate>(
  priority: &SourcePriority,
  first_in_run: bool,
  existing: Option<&Stored<T>>,
  candidate: T,
  finish: impl FnOnce(&mut T),
) -> Decision<T> {
  if !first_in_run {
    return Decision::Skip(SkipReason::DuplicateInRun);
  }
  let Some(stored) = existing else {
    return Decision::Insert(candidate);
  };
  if !priority.outranks(candidate.source_tag(), stored.record.source_tag()) {
    return Decision::Skip(SkipReason::Outranked);
  }

  let mut merged = candidate.merge_over(&stored.record);
  finish(&mut merged);
  if merged == stored.record {
    return Decision::Skip(SkipReason::Unchanged);
  }
  Decision::Update(Stored {
    id:     stored.id.clone(),
    record: merged,
  })
}

// ─── Plans ───────────────────────────────────────────────────────────────────

/// Writes planned for one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan<T> {
  pub inserts: Vec<T>,
  pub updates: Vec<Stored<T>>,
}

impl<T> Default for Plan<T> {
  fn default() -> Self {
    Self {
      inserts: Vec::new(),
      updates: Vec::new(),
    }
  }
}

impl<T> Plan<T> {
  pub fn is_empty(&self) -> bool { self.inserts.is_empty() && self.updates.is_empty() }
}

fn apply<T: Candidate>(
  ctx: &mut RunContext,
  entity: EntityKind,
  plan: &mut Plan<T>,
  key: &T::Key,
  decision: Decision<T>,
) {
  match decision {
    Decision::Insert(record) => {
      debug!(%entity, ?key, "insert");
      plan.inserts.push(record);
    }
    Decision::Update(stored) => {
      debug!(%entity, ?key, id = %stored.id, "update");
      plan.updates.push(stored);
    }
    Decision::Skip(reason) => {
      debug!(%entity, ?key, ?reason, "skip");
      ctx.report_mut().counts_mut(entity).skipped += 1;
    }
  }
}

fn index_snapshot<T: Candidate>(snapshot: &[Stored<T>]) -> HashMap<T::Key, &Stored<T>> {
  let mut index = HashMap::with_capacity(snapshot.len());
  for stored in snapshot {
    // A store that already violates key uniqueness keeps its oldest entry.
    index.entry(stored.record.dedup_key()).or_insert(stored);
  }
  index
}

/// Plan company writes against the stored snapshot.
pub fn plan_companies(
  ctx: &mut RunContext,
  snapshot: &[Stored<Company>],
  candidates: Vec<Company>,
) -> Plan<Company> {
  let existing = index_snapshot(snapshot);
  let priority = ctx.config().source_priority.clone();
  let mut plan = Plan::default();

  for candidate in candidates {
    let key = candidate.key();
    let first = ctx.claim_company(&key);
    let decision =
      decide(&priority, first, existing.get(&key).copied(), candidate, |_| {});
    apply(ctx, EntityKind::Company, &mut plan, &key, decision);
  }
  plan
}

/// Plan contact writes. Each candidate is resolved to its owning company,
/// classified with that company's tier, then deduplicated.
pub fn plan_contacts(
  ctx: &mut RunContext,
  directory: &CompanyDirectory,
  snapshot: &[Stored<Contact>],
  candidates: Vec<Contact>,
) -> Plan<Contact> {
  let existing = index_snapshot(snapshot);
  let priority = ctx.config().source_priority.clone();
  let mut plan = Plan::default();

  for mut candidate in candidates {
    let Some(owner) = directory.resolve(&candidate.company) else {
      warn!(
        contact = %candidate.name,
        company = %candidate.company,
        "owning company not found; contact skipped"
      );
      ctx.report_mut().contacts.orphaned += 1;
      continue;
    };

    let tier = owner.tier;
    candidate.company = owner.name.clone();
    candidate.classify(tier);

    let key = candidate.key();
    let first = ctx.claim_contact(&key);
    let decision = decide(
      &priority,
      first,
      existing.get(&key).copied(),
      candidate,
      |merged| merged.classify(tier),
    );
    apply(ctx, EntityKind::Contact, &mut plan, &key, decision);
  }
  plan
}

// ─── Company directory ───────────────────────────────────────────────────────

/// A company a contact can attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
  /// Display name as stored (or as planned for insert).
  pub name: String,
  pub tier: Option<PriorityTier>,
  /// `None` until a planned insert has been written.
  pub id:   Option<RecordId>,
}

/// Every company known to this run: the stored snapshot overlaid with the
/// run's planned updates and inserts.
#[derive(Debug, Clone, Default)]
pub struct CompanyDirectory {
  entries: HashMap<CompanyKey, DirectoryEntry>,
}

impl CompanyDirectory {
  pub fn build(snapshot: &[Stored<Company>], plan: &Plan<Company>) -> Self {
    let mut entries = HashMap::new();
    for stored in snapshot {
      entries.entry(stored.record.key()).or_insert(DirectoryEntry {
        name: stored.record.name.clone(),
        tier: stored.record.priority_tier,
        id:   Some(stored.id.clone()),
      });
    }
    for stored in &plan.updates {
      if let Some(entry) = entries.get_mut(&stored.record.key()) {
        entry.tier = stored.record.priority_tier;
      }
    }
    for company in &plan.inserts {
      entries.insert(company.key(), DirectoryEntry {
        name: company.name.clone(),
        tier: company.priority_tier,
        id:   None,
      });
    }
    Self { entries }
  }

  pub fn resolve(&self, company_name: &str) -> Option<&DirectoryEntry> {
    self.entries.get(&CompanyKey::new(company_name))
  }

  /// Record the identifier a planned insert was written under.
  pub fn assign_id(&mut self, key: &CompanyKey, id: RecordId) {
    if let Some(entry) = self.entries.get_mut(key) {
      entry.id = Some(id);
    }
  }

  pub fn id_for(&self, company_name: &str) -> Option<&RecordId> {
    self.resolve(company_name).and_then(|e| e.id.as_ref())
  }
}
