//! Data model — companies, contacts, and the categorical attributes derived
//! for them.
//!
//! Companies and contacts are plain values. Destination stores wrap them in
//! [`Stored`] to attach the identifier they were persisted under; a contact
//! refers to its owning company by that identifier, never by embedding.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::normalize::{collapse_whitespace, normalize_company_name};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// An opaque identifier assigned by a destination store.
///
/// SQLite hands out UUIDs, the CRM hands out numeric strings; the pipeline
/// never interprets the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A record together with the identifier a destination store holds it under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
  pub id:     RecordId,
  pub record: T,
}

// ─── Company attributes ──────────────────────────────────────────────────────

/// Account priority assigned by the go-to-market team.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum PriorityTier {
  Tier1,
  Tier2,
  Tier3,
  Tier4,
  Customer,
}

impl PriorityTier {
  /// Lenient parse for spreadsheet values: `Tier 1`, `tier1`, `T1`, `1`,
  /// `customer`. Returns `None` for anything unrecognised.
  pub fn parse_loose(raw: &str) -> Option<Self> {
    let compact: String = raw
      .chars()
      .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
      .collect::<String>()
      .to_ascii_lowercase();

    let digits = compact
      .strip_prefix("tier")
      .or_else(|| compact.strip_prefix('t'))
      .unwrap_or(&compact);

    match digits {
      "1" => Some(Self::Tier1),
      "2" => Some(Self::Tier2),
      "3" => Some(Self::Tier3),
      "4" => Some(Self::Tier4),
      _ if compact.starts_with("customer")
        || compact == "activecustomer"
        || compact == "existingcustomer" =>
      {
        Some(Self::Customer)
      }
      _ => None,
    }
  }
}

/// Strength of the buying signal that surfaced a company.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum SignalStrength {
  High,
  Medium,
  Low,
}

impl SignalStrength {
  pub fn parse_loose(raw: &str) -> Option<Self> { raw.trim().parse().ok() }
}

// ─── Contact attributes ──────────────────────────────────────────────────────

/// Seniority derived from a job title.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum JobLevel {
  Executive,
  #[strum(serialize = "SVP")]
  #[serde(rename = "SVP")]
  Svp,
  #[strum(serialize = "VP")]
  #[serde(rename = "VP")]
  Vp,
  Director,
  #[strum(serialize = "Senior Manager")]
  #[serde(rename = "Senior Manager")]
  SeniorManager,
  Manager,
  Senior,
  #[strum(serialize = "Individual Contributor")]
  #[serde(rename = "Individual Contributor")]
  IndividualContributor,
  #[default]
  Unknown,
}

impl JobLevel {
  /// `true` for the vice-president family (`VP`, `SVP`).
  pub fn is_vp_family(self) -> bool { matches!(self, Self::Vp | Self::Svp) }
}

/// Functional area derived from a job title.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum JobFunction {
  Product,
  Engineering,
  #[strum(serialize = "Design/UX")]
  #[serde(rename = "Design/UX")]
  Design,
  #[strum(serialize = "Customer Success")]
  #[serde(rename = "Customer Success")]
  CustomerSuccess,
  Operations,
  #[strum(serialize = "Strategy/Innovation")]
  #[serde(rename = "Strategy/Innovation")]
  StrategyInnovation,
  #[strum(serialize = "Banking/Finance")]
  #[serde(rename = "Banking/Finance")]
  BankingFinance,
  Marketing,
  Sales,
  Events,
  Content,
  #[default]
  #[strum(serialize = "General Management")]
  #[serde(rename = "General Management")]
  GeneralManagement,
}

/// Buying-committee role derived from level and title.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum RoleType {
  #[strum(serialize = "Decision Maker")]
  #[serde(rename = "Decision Maker")]
  DecisionMaker,
  Influencer,
  Champion,
  #[default]
  User,
}

// ─── Company ─────────────────────────────────────────────────────────────────

/// A target organisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
  /// Display name; the lower-cased form is the dedup key.
  pub name:               String,
  /// Bare lower-case hostname.
  pub domain:             Option<String>,
  /// Industry or segment label.
  pub classification_tag: Option<String>,
  pub priority_tier:      Option<PriorityTier>,
  pub signal_strength:    Option<SignalStrength>,
  /// Free-text lifecycle label, e.g. "prospect".
  pub status:             Option<String>,
  /// Provenance tag, ranked by [`crate::source::SourcePriority`].
  pub source:             Option<String>,
}

impl Company {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn key(&self) -> CompanyKey { CompanyKey::new(&self.name) }

  /// Overlay `self` onto `existing`: fields set on `self` win, fields left
  /// empty fall back to the existing value. The stored display name is kept.
  pub fn merged_over(&self, existing: &Company) -> Company {
    Company {
      name:               existing.name.clone(),
      domain:             prefer(&self.domain, &existing.domain),
      classification_tag: prefer(
        &self.classification_tag,
        &existing.classification_tag,
      ),
      priority_tier:      self.priority_tier.or(existing.priority_tier),
      signal_strength:    self.signal_strength.or(existing.signal_strength),
      status:             prefer(&self.status, &existing.status),
      source:             prefer(&self.source, &existing.source),
    }
  }
}

// ─── Contact ─────────────────────────────────────────────────────────────────

/// A person associated with exactly one [`Company`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub name:          String,
  /// Name of the owning company. Resolved to a [`RecordId`] at write time.
  pub company:       String,
  pub title:         Option<String>,
  pub job_function:  JobFunction,
  pub job_level:     JobLevel,
  pub role_type:     RoleType,
  pub linkedin_url:  Option<String>,
  pub email:         Option<String>,
  pub location:      Option<String>,
  pub persona_score: u8,
  pub source:        Option<String>,
}

impl Contact {
  pub fn new(name: impl Into<String>, company: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      company: company.into(),
      ..Self::default()
    }
  }

  pub fn key(&self) -> ContactKey { ContactKey::new(&self.name, &self.company) }

  /// Overlay `self` onto `existing`. Derived attributes are carried over from
  /// `self` unchanged; callers reclassify the merged title afterwards.
  pub fn merged_over(&self, existing: &Contact) -> Contact {
    Contact {
      name:          existing.name.clone(),
      company:       existing.company.clone(),
      title:         prefer(&self.title, &existing.title),
      job_function:  self.job_function,
      job_level:     self.job_level,
      role_type:     self.role_type,
      linkedin_url:  prefer(&self.linkedin_url, &existing.linkedin_url),
      email:         prefer(&self.email, &existing.email),
      location:      prefer(&self.location, &existing.location),
      persona_score: self.persona_score,
      source:        prefer(&self.source, &existing.source),
    }
  }
}

/// Input to [`crate::store::DestinationStore::create_contacts`]: a contact
/// plus the resolved identifier of its owning company.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
  pub company_id: RecordId,
  pub contact:    Contact,
}

fn prefer(candidate: &Option<String>, existing: &Option<String>) -> Option<String> {
  match candidate {
    Some(v) if !v.trim().is_empty() => Some(v.clone()),
    _ => existing.clone(),
  }
}

// ─── Ingestion batch ─────────────────────────────────────────────────────────

/// Normalized candidates from one input file or API page. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionBatch {
  /// Provenance tag applied to records that arrive without one; its rank in
  /// the source priority decides conflicts.
  pub source:    Option<String>,
  pub companies: Vec<Company>,
  pub contacts:  Vec<Contact>,
}

impl IngestionBatch {
  pub fn with_source(source: impl Into<String>) -> Self {
    Self {
      source: Some(source.into()),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.companies.is_empty() && self.contacts.is_empty()
  }

  /// Stamp the batch source onto records that have none.
  pub fn apply_default_source(&mut self) {
    let Some(source) = self.source.clone() else {
      return;
    };
    for company in &mut self.companies {
      if company.source.as_deref().is_none_or(|s| s.trim().is_empty()) {
        company.source = Some(source.clone());
      }
    }
    for contact in &mut self.contacts {
      if contact.source.as_deref().is_none_or(|s| s.trim().is_empty()) {
        contact.source = Some(source.clone());
      }
    }
  }

  /// Append `other` after this batch, stamping each side with its own source
  /// first so the tags survive the merge.
  pub fn extend(&mut self, mut other: IngestionBatch) {
    self.apply_default_source();
    other.apply_default_source();
    self.companies.append(&mut other.companies);
    self.contacts.append(&mut other.contacts);
  }
}

// ─── Dedup keys ──────────────────────────────────────────────────────────────

/// Case-insensitive company key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompanyKey(String);

impl CompanyKey {
  pub fn new(name: &str) -> Self {
    Self(normalize_company_name(Some(name)).to_lowercase())
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

/// Case-insensitive `(contact name, company name)` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactKey {
  pub name:    String,
  pub company: CompanyKey,
}

impl ContactKey {
  pub fn new(name: &str, company: &str) -> Self {
    Self {
      name:    collapse_whitespace(name).to_lowercase(),
      company: CompanyKey::new(company),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tier_parse_loose_accepts_spreadsheet_spellings() {
    assert_eq!(PriorityTier::parse_loose("Tier 1"), Some(PriorityTier::Tier1));
    assert_eq!(PriorityTier::parse_loose("tier2"), Some(PriorityTier::Tier2));
    assert_eq!(PriorityTier::parse_loose("T3"), Some(PriorityTier::Tier3));
    assert_eq!(PriorityTier::parse_loose("4"), Some(PriorityTier::Tier4));
    assert_eq!(
      PriorityTier::parse_loose("Customer"),
      Some(PriorityTier::Customer)
    );
    assert_eq!(PriorityTier::parse_loose("gold"), None);
    assert_eq!(PriorityTier::parse_loose(""), None);
  }

  #[test]
  fn enum_labels_round_trip_through_strum() {
    assert_eq!(JobLevel::SeniorManager.to_string(), "Senior Manager");
    assert_eq!("vp".parse::<JobLevel>().unwrap(), JobLevel::Vp);
    assert_eq!(RoleType::DecisionMaker.as_ref(), "Decision Maker");
    assert_eq!(
      "strategy/innovation".parse::<JobFunction>().unwrap(),
      JobFunction::StrategyInnovation
    );
  }

  #[test]
  fn contact_keys_ignore_case_and_spacing() {
    assert_eq!(
      ContactKey::new("Jane Doe", "Acme Inc"),
      ContactKey::new("jane  doe", " acme inc ")
    );
    assert_ne!(
      ContactKey::new("Jane Doe", "Acme Inc"),
      ContactKey::new("Jane Doe", "Acme Ltd")
    );
  }

  #[test]
  fn company_merge_prefers_candidate_non_empty_fields() {
    let existing = Company {
      name: "Acme Inc".into(),
      domain: Some("acme.com".into()),
      status: Some("prospect".into()),
      priority_tier: Some(PriorityTier::Tier3),
      ..Company::default()
    };
    let candidate = Company {
      name: "ACME INC".into(),
      domain: Some("".into()),
      status: Some("Active Customer".into()),
      classification_tag: Some("Fintech".into()),
      ..Company::default()
    };

    let merged = candidate.merged_over(&existing);
    assert_eq!(merged.name, "Acme Inc");
    assert_eq!(merged.domain.as_deref(), Some("acme.com"));
    assert_eq!(merged.status.as_deref(), Some("Active Customer"));
    assert_eq!(merged.classification_tag.as_deref(), Some("Fintech"));
    assert_eq!(merged.priority_tier, Some(PriorityTier::Tier3));
  }

  #[test]
  fn batch_source_fills_only_missing_tags() {
    let mut batch = IngestionBatch::with_source("Deep Research");
    batch.contacts.push(Contact::new("Jane Doe", "Acme Inc"));
    batch.contacts.push(Contact {
      source: Some("Product Signup".into()),
      ..Contact::new("Bob Roe", "Acme Inc")
    });
    batch.apply_default_source();
    assert_eq!(batch.contacts[0].source.as_deref(), Some("Deep Research"));
    assert_eq!(batch.contacts[1].source.as_deref(), Some("Product Signup"));
  }
}
