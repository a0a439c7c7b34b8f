//! Mapping between domain records and CRM object properties.
//!
//! The CRM stores every property as a string. Standard properties are used
//! where one exists (`name`, `domain`, `industry`, `jobtitle`, `email`,
//! `city`, `company`); the scoring attributes live in custom properties.

use std::collections::BTreeMap;

use leadsync_core::{
  model::{Company, Contact, PriorityTier, SignalStrength},
  normalize::collapse_whitespace,
};

pub type Properties = BTreeMap<String, String>;

/// Company properties requested when listing.
pub const COMPANY_PROPERTIES: &[&str] = &[
  "name",
  "domain",
  "industry",
  "priority_tier",
  "signal_strength",
  "hs_lead_status",
  "lead_source",
];

/// Contact properties requested when listing.
pub const CONTACT_PROPERTIES: &[&str] = &[
  "firstname",
  "lastname",
  "company",
  "jobtitle",
  "job_function",
  "job_level",
  "role_type",
  "persona_score",
  "linkedin_url",
  "email",
  "city",
  "lead_source",
];

fn put(props: &mut Properties, key: &str, value: Option<&str>) {
  if let Some(v) = value.filter(|v| !v.is_empty()) {
    props.insert(key.to_owned(), v.to_owned());
  }
}

fn label<T: AsRef<str>>(value: Option<&T>) -> Option<&str> { value.map(|v| v.as_ref()) }

fn take(props: &BTreeMap<String, Option<String>>, key: &str) -> Option<String> {
  props
    .get(key)
    .and_then(|v| v.as_deref())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(str::to_owned)
}

// ─── Companies ───────────────────────────────────────────────────────────────

pub fn company_properties(company: &Company) -> Properties {
  let mut props = Properties::new();
  props.insert("name".into(), company.name.clone());
  put(&mut props, "domain", company.domain.as_deref());
  put(&mut props, "industry", company.classification_tag.as_deref());
  put(&mut props, "priority_tier", label(company.priority_tier.as_ref()));
  put(&mut props, "signal_strength", label(company.signal_strength.as_ref()));
  put(&mut props, "hs_lead_status", company.status.as_deref());
  put(&mut props, "lead_source", company.source.as_deref());
  props
}

/// `None` when the object has no usable name; such rows cannot take part in
/// deduplication.
pub fn company_from_properties(props: &BTreeMap<String, Option<String>>) -> Option<Company> {
  let name = collapse_whitespace(&take(props, "name")?);
  Some(Company {
    name,
    domain: take(props, "domain").map(|d| d.to_lowercase()),
    classification_tag: take(props, "industry"),
    priority_tier: take(props, "priority_tier")
      .as_deref()
      .and_then(PriorityTier::parse_loose),
    signal_strength: take(props, "signal_strength")
      .as_deref()
      .and_then(SignalStrength::parse_loose),
    status: take(props, "hs_lead_status"),
    source: take(props, "lead_source"),
  })
}

// ─── Contacts ────────────────────────────────────────────────────────────────

/// Split a full name at the first space: `"Mary Ann Smith"` → `("Mary", "Ann Smith")`.
pub fn split_name(full: &str) -> (&str, &str) {
  let full = full.trim();
  match full.split_once(' ') {
    Some((first, last)) => (first, last.trim()),
    None => (full, ""),
  }
}

pub fn contact_properties(contact: &Contact) -> Properties {
  let (first, last) = split_name(&contact.name);
  let mut props = Properties::new();
  props.insert("firstname".into(), first.to_owned());
  put(&mut props, "lastname", Some(last));
  props.insert("company".into(), contact.company.clone());
  put(&mut props, "jobtitle", contact.title.as_deref());
  props.insert("job_function".into(), contact.job_function.to_string());
  props.insert("job_level".into(), contact.job_level.to_string());
  props.insert("role_type".into(), contact.role_type.to_string());
  props.insert("persona_score".into(), contact.persona_score.to_string());
  put(&mut props, "linkedin_url", contact.linkedin_url.as_deref());
  put(&mut props, "email", contact.email.as_deref());
  put(&mut props, "city", contact.location.as_deref());
  put(&mut props, "lead_source", contact.source.as_deref());
  props
}

/// `None` when the object lacks a name or a company name. Unparseable derived
/// attributes fall back to their defaults; the pipeline reclassifies anyway.
pub fn contact_from_properties(props: &BTreeMap<String, Option<String>>) -> Option<Contact> {
  let first = take(props, "firstname").unwrap_or_default();
  let last = take(props, "lastname").unwrap_or_default();
  let name = collapse_whitespace(&format!("{first} {last}"));
  let company = collapse_whitespace(&take(props, "company")?);
  if name.is_empty() || company.is_empty() {
    return None;
  }

  Some(Contact {
    title: take(props, "jobtitle"),
    job_function: parse_or_default(take(props, "job_function")),
    job_level: parse_or_default(take(props, "job_level")),
    role_type: parse_or_default(take(props, "role_type")),
    persona_score: take(props, "persona_score")
      .and_then(|s| s.parse::<u8>().ok())
      .map_or(0, |s| s.min(100)),
    linkedin_url: take(props, "linkedin_url"),
    email: take(props, "email").map(|e| e.to_lowercase()),
    location: take(props, "city"),
    source: take(props, "lead_source"),
    ..Contact::new(name, company)
  })
}

fn parse_or_default<T: std::str::FromStr + Default>(raw: Option<String>) -> T {
  raw.and_then(|s| s.parse().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use leadsync_core::model::{JobFunction, JobLevel, RoleType};

  use super::*;

  fn read(props: &Properties) -> BTreeMap<String, Option<String>> {
    props.iter().map(|(k, v)| (k.clone(), Some(v.clone()))).collect()
  }

  #[test]
  fn names_split_at_first_space() {
    assert_eq!(split_name("Jane Doe"), ("Jane", "Doe"));
    assert_eq!(split_name(" Mary Ann Smith "), ("Mary", "Ann Smith"));
    assert_eq!(split_name("Cher"), ("Cher", ""));
  }

  #[test]
  fn company_properties_omit_empty_fields() {
    let company = Company {
      priority_tier: Some(PriorityTier::Tier2),
      source: Some("Deep Research".into()),
      ..Company::new("Acme Inc")
    };
    let props = company_properties(&company);

    assert_eq!(props["name"], "Acme Inc");
    assert_eq!(props["priority_tier"], "Tier2");
    assert_eq!(props["lead_source"], "Deep Research");
    assert!(!props.contains_key("domain"));
    assert_eq!(company_from_properties(&read(&props)), Some(company));
  }

  #[test]
  fn contact_properties_carry_derived_labels() {
    let mut contact = Contact {
      title: Some("Senior Manager, Partnerships".into()),
      ..Contact::new("Jane Doe", "Acme Inc")
    };
    contact.classify(None);
    let props = contact_properties(&contact);

    assert_eq!(props["firstname"], "Jane");
    assert_eq!(props["lastname"], "Doe");
    assert_eq!(props["job_level"], "Senior Manager");
    assert_eq!(props["role_type"], "Influencer");
    assert_eq!(contact_from_properties(&read(&props)), Some(contact));
  }

  #[test]
  fn contacts_without_company_are_unusable() {
    let mut props = BTreeMap::new();
    props.insert("firstname".to_string(), Some("Jane".to_string()));
    props.insert("company".to_string(), None);
    assert!(contact_from_properties(&props).is_none());
  }

  #[test]
  fn unknown_labels_fall_back_to_defaults() {
    let mut props = BTreeMap::new();
    props.insert("firstname".to_string(), Some("Jane".to_string()));
    props.insert("company".to_string(), Some("Acme".to_string()));
    props.insert("job_level".to_string(), Some("Overlord".to_string()));
    props.insert("job_function".to_string(), Some("".to_string()));
    props.insert("persona_score".to_string(), Some("high".to_string()));

    let contact = contact_from_properties(&props).unwrap();
    assert_eq!(contact.job_level, JobLevel::Unknown);
    assert_eq!(contact.job_function, JobFunction::GeneralManagement);
    assert_eq!(contact.role_type, RoleType::User);
    assert_eq!(contact.persona_score, 0);
  }
}
