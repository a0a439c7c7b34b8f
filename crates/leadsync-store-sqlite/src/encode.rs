//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. Enumerations are stored by their display
//! label. Record ids are hyphenated lowercase UUIDs.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use leadsync_core::model::{
  Company, CompanyKey, Contact, ContactKey, RecordId, Stored,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Ids ─────────────────────────────────────────────────────────────────────

pub fn new_id() -> String { Uuid::new_v4().hyphenated().to_string() }

pub fn decode_id(s: &str) -> Result<RecordId> {
  Ok(RecordId::new(Uuid::parse_str(s)?.hyphenated().to_string()))
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Keys ────────────────────────────────────────────────────────────────────

pub fn company_name_key(name: &str) -> String { CompanyKey::new(name).as_str().to_owned() }

pub fn contact_name_key(contact: &Contact) -> String {
  ContactKey::new(&contact.name, &contact.company).name
}

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Enum columns store the display label (`Tier1`, `Senior Manager`).
pub fn encode_enum<T: AsRef<str>>(value: T) -> String { value.as_ref().to_owned() }

pub fn decode_enum<T: FromStr>(column: &'static str, raw: &str) -> Result<T> {
  raw
    .parse()
    .map_err(|_| Error::Decode { column, value: raw.to_owned() })
}

fn decode_opt_enum<T: FromStr>(column: &'static str, raw: Option<String>) -> Result<Option<T>> {
  raw.map(|s| decode_enum(column, &s)).transpose()
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// A `companies` row as read by rusqlite, before decoding.
pub struct RawCompany {
  pub company_id:         String,
  pub name:               String,
  pub domain:             Option<String>,
  pub classification_tag: Option<String>,
  pub priority_tier:      Option<String>,
  pub signal_strength:    Option<String>,
  pub status:             Option<String>,
  pub source:             Option<String>,
}

pub const COMPANY_COLUMNS: &str = "company_id, name, domain, classification_tag, \
  priority_tier, signal_strength, status, source";

impl RawCompany {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      company_id:         row.get(0)?,
      name:               row.get(1)?,
      domain:             row.get(2)?,
      classification_tag: row.get(3)?,
      priority_tier:      row.get(4)?,
      signal_strength:    row.get(5)?,
      status:             row.get(6)?,
      source:             row.get(7)?,
    })
  }

  pub fn into_stored(self) -> Result<Stored<Company>> {
    Ok(Stored {
      id:     decode_id(&self.company_id)?,
      record: Company {
        name:               self.name,
        domain:             self.domain,
        classification_tag: self.classification_tag,
        priority_tier:      decode_opt_enum("priority_tier", self.priority_tier)?,
        signal_strength:    decode_opt_enum("signal_strength", self.signal_strength)?,
        status:             self.status,
        source:             self.source,
      },
    })
  }
}

/// A `contacts` row joined with its company's display name.
pub struct RawContact {
  pub contact_id:    String,
  pub company_name:  String,
  pub name:          String,
  pub title:         Option<String>,
  pub job_function:  String,
  pub job_level:     String,
  pub role_type:     String,
  pub persona_score: i64,
  pub linkedin_url:  Option<String>,
  pub email:         Option<String>,
  pub location:      Option<String>,
  pub source:        Option<String>,
}

pub const CONTACT_COLUMNS: &str = "p.contact_id, c.name, p.name, p.title, \
  p.job_function, p.job_level, p.role_type, p.persona_score, p.linkedin_url, \
  p.email, p.location, p.source";

impl RawContact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contact_id:    row.get(0)?,
      company_name:  row.get(1)?,
      name:          row.get(2)?,
      title:         row.get(3)?,
      job_function:  row.get(4)?,
      job_level:     row.get(5)?,
      role_type:     row.get(6)?,
      persona_score: row.get(7)?,
      linkedin_url:  row.get(8)?,
      email:         row.get(9)?,
      location:      row.get(10)?,
      source:        row.get(11)?,
    })
  }

  pub fn into_stored(self) -> Result<Stored<Contact>> {
    let persona_score = u8::try_from(self.persona_score).map_err(|_| Error::Decode {
      column: "persona_score",
      value:  self.persona_score.to_string(),
    })?;

    Ok(Stored {
      id:     decode_id(&self.contact_id)?,
      record: Contact {
        name: self.name,
        company: self.company_name,
        title: self.title,
        job_function: decode_enum("job_function", &self.job_function)?,
        job_level: decode_enum("job_level", &self.job_level)?,
        role_type: decode_enum("role_type", &self.role_type)?,
        linkedin_url: self.linkedin_url,
        email: self.email,
        location: self.location,
        persona_score,
        source: self.source,
      },
    })
  }
}
