//! Record normalizer — canonicalizes heterogeneous input rows.
//!
//! Upstream sources are spreadsheets and exports with no fixed schema, so
//! every canonical [`Field`] has an ordered list of header aliases. The alias
//! table is resolved once per input against its header row, producing a
//! [`ColumnMap`]; rows are then read through that fixed mapping.
//!
//! ```text
//! headers ─ AliasTable::resolve ─ ColumnMap
//! row     ─ ColumnMap::map_fields ─ MappedRecord ─ company_from_record / contact_from_record
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{
  Error, Result,
  model::{Company, Contact, PriorityTier, SignalStrength},
};

// ─── String helpers ──────────────────────────────────────────────────────────

/// Trim and collapse runs of internal whitespace to a single space.
pub fn collapse_whitespace(raw: &str) -> String {
  raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical display form of a company name. Case is preserved; missing
/// input yields an empty string, which callers treat as "drop this record".
pub fn normalize_company_name(raw: Option<&str>) -> String {
  raw.map(collapse_whitespace).unwrap_or_default()
}

/// Reduce a URL or hostname to a bare lower-case hostname.
///
/// Strips the protocol, a leading `www.`, any path, query, port, and trailing
/// `/`. Input without a recognisable hostname yields an empty string.
pub fn normalize_domain(raw: Option<&str>) -> String {
  let Some(raw) = raw else {
    return String::new();
  };

  let lowered = raw.trim().to_lowercase();
  let without_scheme = ["https://", "http://"]
    .iter()
    .find_map(|p| lowered.strip_prefix(*p))
    .unwrap_or(&lowered);
  let without_www = without_scheme
    .strip_prefix("www.")
    .unwrap_or(without_scheme);

  let host = without_www
    .split(['/', '?', '#'])
    .next()
    .unwrap_or_default()
    .split(':')
    .next()
    .unwrap_or_default()
    .trim_matches('.');

  let recognisable = host.contains('.')
    && host
      .chars()
      .all(|c| c.is_alphanumeric() || c == '-' || c == '.')
    && !host.contains("..");

  if recognisable {
    host.to_string()
  } else {
    String::new()
  }
}

/// Lower-cased address, or `None` when the value is not an address at all.
pub fn normalize_email(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  match trimmed.split_once('@') {
    Some((local, host)) if !local.is_empty() && host.contains('.') => {
      Some(trimmed.to_lowercase())
    }
    _ => None,
  }
}

/// Trimmed profile URL without a trailing `/`.
pub fn normalize_profile_url(raw: &str) -> Option<String> {
  let trimmed = raw.trim().trim_end_matches('/');
  (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn non_empty(raw: Option<&str>) -> Option<String> {
  raw
    .map(collapse_whitespace)
    .filter(|s| !s.is_empty())
}

// ─── Canonical fields ────────────────────────────────────────────────────────

/// Canonical field a header column can map to.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
  CompanyName,
  Domain,
  ClassificationTag,
  PriorityTier,
  SignalStrength,
  Status,
  Source,
  ContactName,
  FirstName,
  LastName,
  Title,
  LinkedinUrl,
  Email,
  Location,
}

impl Field {
  /// Built-in header aliases, most specific first.
  fn default_aliases(self) -> &'static [&'static str] {
    match self {
      Self::CompanyName => &[
        "company",
        "Company",
        "Company Name",
        "company_name",
        "companyName",
        "Organization",
        "organization",
        "Account Name",
        "Account",
      ],
      Self::Domain => &[
        "domain",
        "Domain",
        "Website",
        "website",
        "Company Domain",
        "company_domain",
        "URL",
      ],
      Self::ClassificationTag => &[
        "classification",
        "Classification",
        "Industry",
        "industry",
        "Segment",
        "segment",
        "Category",
      ],
      Self::PriorityTier => &[
        "tier",
        "Tier",
        "Priority Tier",
        "priority_tier",
        "priorityTier",
        "Priority",
      ],
      Self::SignalStrength => &[
        "signal",
        "Signal",
        "Signal Strength",
        "signal_strength",
        "signalStrength",
      ],
      Self::Status => &["status", "Status", "Lifecycle Stage", "Stage"],
      Self::Source => &["source", "Source", "Lead Source", "lead_source"],
      Self::ContactName => &[
        "name",
        "Name",
        "Full Name",
        "full_name",
        "fullName",
        "Contact Name",
        "contact",
        "Contact",
      ],
      Self::FirstName => &["first_name", "First Name", "firstName", "firstname"],
      Self::LastName => &["last_name", "Last Name", "lastName", "lastname"],
      Self::Title => &[
        "title",
        "Title",
        "Job Title",
        "job_title",
        "jobTitle",
        "jobtitle",
        "Position",
        "Headline",
      ],
      Self::LinkedinUrl => &[
        "linkedin",
        "LinkedIn",
        "LinkedIn URL",
        "linkedin_url",
        "linkedinUrl",
        "Profile URL",
      ],
      Self::Email => &["email", "Email", "Email Address", "email_address"],
      Self::Location => &["location", "Location", "City", "Region", "Geo"],
    }
  }
}

// ─── Alias table ─────────────────────────────────────────────────────────────

/// Ordered header aliases per canonical field.
#[derive(Debug, Clone)]
pub struct AliasTable {
  aliases: HashMap<Field, Vec<String>>,
}

impl Default for AliasTable {
  fn default() -> Self {
    let aliases = Field::iter()
      .map(|f| {
        let list = f.default_aliases().iter().map(|a| a.to_string()).collect();
        (f, list)
      })
      .collect();
    Self { aliases }
  }
}

impl AliasTable {
  /// The built-in table with `extra` aliases appended after the defaults.
  ///
  /// Keys of `extra` are snake_case field names (`company_name`, `title`, …);
  /// an unknown key is a configuration error.
  pub fn with_extra(extra: &HashMap<String, Vec<String>>) -> Result<Self> {
    let mut table = Self::default();
    for (name, aliases) in extra {
      let field: Field = name
        .parse()
        .map_err(|_| Error::Config(format!("unknown alias field {name:?}")))?;
      table
        .aliases
        .entry(field)
        .or_default()
        .extend(aliases.iter().cloned());
    }
    Ok(table)
  }

  pub fn aliases(&self, field: Field) -> &[String] {
    self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Resolve the table against a header row.
  ///
  /// For each field the first alias (in table order) that names a header
  /// wins; exact matches are tried before a case-insensitive pass.
  pub fn resolve<H: AsRef<str>>(&self, headers: &[H]) -> ColumnMap {
    let trimmed: Vec<&str> = headers.iter().map(|h| h.as_ref().trim()).collect();

    let mut columns = HashMap::new();
    for field in Field::iter() {
      let aliases = self.aliases(field);
      let exact = aliases
        .iter()
        .find_map(|a| trimmed.iter().position(|h| *h == a.as_str()));
      let found = exact.or_else(|| {
        aliases
          .iter()
          .find_map(|a| trimmed.iter().position(|h| h.eq_ignore_ascii_case(a)))
      });
      if let Some(idx) = found {
        columns.insert(field, idx);
      }
    }
    ColumnMap { columns }
  }
}

// ─── Column map ──────────────────────────────────────────────────────────────

/// A fixed field → column-index mapping for one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
  columns: HashMap<Field, usize>,
}

impl ColumnMap {
  pub fn column(&self, field: Field) -> Option<usize> {
    self.columns.get(&field).copied()
  }

  /// Read `field` from the column already mapped to `from`, unless `field`
  /// has a column of its own.
  pub fn fall_back(&mut self, field: Field, from: Field) {
    if let Some(idx) = self.column(from) {
      self.columns.entry(field).or_insert(idx);
    }
  }

  /// Read one row through the mapping. Blank cells are omitted.
  pub fn map_fields<S: AsRef<str>>(&self, row: &[S]) -> MappedRecord {
    let values = self
      .columns
      .iter()
      .filter_map(|(field, &idx)| {
        let cell = row.get(idx)?.as_ref().trim();
        (!cell.is_empty()).then(|| (*field, cell.to_string()))
      })
      .collect();
    MappedRecord { values }
  }
}

/// A row keyed by canonical field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedRecord {
  values: HashMap<Field, String>,
}

impl MappedRecord {
  pub fn get(&self, field: Field) -> Option<&str> {
    self.values.get(&field).map(String::as_str)
  }

  pub fn set(&mut self, field: Field, value: impl Into<String>) {
    self.values.insert(field, value.into());
  }

  /// Full contact name, falling back to first + last name columns.
  pub fn contact_name(&self) -> String {
    let full = collapse_whitespace(self.get(Field::ContactName).unwrap_or(""));
    if !full.is_empty() {
      return full;
    }
    let first = self.get(Field::FirstName).unwrap_or("");
    let last = self.get(Field::LastName).unwrap_or("");
    collapse_whitespace(&format!("{first} {last}"))
  }
}

// ─── Record construction ─────────────────────────────────────────────────────

/// Build a company candidate. `None` when the company name is empty.
pub fn company_from_record(record: &MappedRecord) -> Option<Company> {
  let name = normalize_company_name(record.get(Field::CompanyName));
  if name.is_empty() {
    return None;
  }

  let domain = normalize_domain(record.get(Field::Domain));
  Some(Company {
    name,
    domain: (!domain.is_empty()).then_some(domain),
    classification_tag: non_empty(record.get(Field::ClassificationTag)),
    priority_tier: record
      .get(Field::PriorityTier)
      .and_then(PriorityTier::parse_loose),
    signal_strength: record
      .get(Field::SignalStrength)
      .and_then(SignalStrength::parse_loose),
    status: non_empty(record.get(Field::Status)),
    source: non_empty(record.get(Field::Source)),
  })
}

/// Build a contact candidate. `None` when either the contact name or the
/// owning company name is empty. Derived attributes are left at their
/// defaults for the classifier to fill in.
pub fn contact_from_record(record: &MappedRecord) -> Option<Contact> {
  let name = record.contact_name();
  let company = normalize_company_name(record.get(Field::CompanyName));
  if name.is_empty() || company.is_empty() {
    return None;
  }

  Some(Contact {
    title: non_empty(record.get(Field::Title)),
    linkedin_url: record
      .get(Field::LinkedinUrl)
      .and_then(normalize_profile_url),
    email: record.get(Field::Email).and_then(normalize_email),
    location: non_empty(record.get(Field::Location)),
    source: non_empty(record.get(Field::Source)),
    ..Contact::new(name, company)
  })
}
