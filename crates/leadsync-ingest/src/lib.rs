//! Input codecs for leadsync.
//!
//! Turns delimited text, JSON documents, and URL lists into normalized
//! [`IngestionBatch`]es. Pure synchronous; no HTTP or database dependencies.
//!
//! Header names vary from file to file, so each input's header row is
//! resolved once against the run's alias table and every row is then read
//! through that fixed column map. Rows that cannot be used are dropped and
//! counted on the [`RunContext`]; only a structurally unreadable input is an
//! error.
//!
//! # Quick start
//!
//! ```no_run
//! use leadsync_core::context::{PipelineConfig, RunContext};
//! use leadsync_ingest::{RecordKind, parse_csv};
//!
//! let mut ctx = RunContext::new(PipelineConfig::default()).unwrap();
//! let csv = "company,name,title\n\"Acme, Inc.\",Jane Doe,CTO\n";
//! let batch = parse_csv(&mut ctx, csv.as_bytes(), RecordKind::Contact).unwrap();
//! assert_eq!(batch.contacts[0].company, "Acme, Inc.");
//! ```

mod delimited;
mod document;
pub mod error;
mod urls;

use std::{fs, io::Read, path::Path};

pub use error::{Error, Result};
use leadsync_core::{
  context::RunContext,
  model::IngestionBatch,
  normalize::{ColumnMap, Field, company_from_record, contact_from_record},
};

// ─── Public types ────────────────────────────────────────────────────────────

/// What each row of an input describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
  Company,
  Contact,
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Parse comma-separated text with a header row.
///
/// Standard quoting applies: a quoted field may contain commas and newlines,
/// and a doubled quote inside it is a literal quote.
pub fn parse_csv<R: Read>(
  ctx: &mut RunContext,
  input: R,
  kind: RecordKind,
) -> Result<IngestionBatch> {
  delimited::parse(ctx, input, kind)
}

/// Parse a JSON document.
///
/// Accepts an object holding `contacts`-style and/or `companies`-style
/// arrays, or a bare array whose elements are all `default_kind`.
pub fn parse_json(
  ctx: &mut RunContext,
  input: &str,
  default_kind: RecordKind,
) -> Result<IngestionBatch> {
  document::parse(ctx, input, default_kind)
}

/// Parse a line-delimited URL list. Blank lines and `#` comments are skipped;
/// entries are otherwise returned verbatim (trimmed).
pub fn parse_url_list(input: &str) -> Vec<String> { urls::parse(input) }

/// Load a file, choosing the codec by extension (`.json`, otherwise CSV).
pub fn load_file(
  ctx: &mut RunContext,
  path: &Path,
  kind: RecordKind,
) -> Result<IngestionBatch> {
  let is_json = path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| e.eq_ignore_ascii_case("json"));

  tracing::info!(path = %path.display(), ?kind, "reading input");
  if is_json {
    let text = fs::read_to_string(path)?;
    parse_json(ctx, &text, kind)
  } else {
    parse_csv(ctx, fs::File::open(path)?, kind)
  }
}

/// Read a URL list from a file.
pub fn load_url_list(path: &Path) -> Result<Vec<String>> {
  Ok(parse_url_list(&fs::read_to_string(path)?))
}

// ─── Shared row handling ─────────────────────────────────────────────────────

/// Company files often call the company column plain "Name".
pub(crate) fn adapt_columns(mut columns: ColumnMap, kind: RecordKind) -> ColumnMap {
  if kind == RecordKind::Company {
    columns.fall_back(Field::CompanyName, Field::ContactName);
  }
  columns
}

/// Normalize one row into `batch`, or count it as dropped.
pub(crate) fn push_row<S: AsRef<str>>(
  ctx: &mut RunContext,
  columns: &ColumnMap,
  row: &[S],
  kind: RecordKind,
  batch: &mut IngestionBatch,
) {
  let record = columns.map_fields(row);
  match kind {
    RecordKind::Company => match company_from_record(&record) {
      Some(company) => batch.companies.push(company),
      None => ctx.record_dropped("missing company name"),
    },
    RecordKind::Contact => match contact_from_record(&record) {
      Some(contact) => batch.contacts.push(contact),
      None => ctx.record_dropped("missing contact or company name"),
    },
  }
}
