//! Comma-separated input.

use std::io::Read;

use leadsync_core::{context::RunContext, model::IngestionBatch};

use crate::{RecordKind, Result, adapt_columns, push_row};

pub(crate) fn parse<R: Read>(
  ctx: &mut RunContext,
  input: R,
  kind: RecordKind,
) -> Result<IngestionBatch> {
  let mut reader = csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(input);

  let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
  let columns = adapt_columns(ctx.config().aliases.resolve(&headers), kind);
  tracing::debug!(?headers, "resolved header row");

  let mut batch = IngestionBatch::default();
  for (line, row) in reader.records().enumerate() {
    match row {
      Ok(row) => {
        let cells: Vec<&str> = row.iter().collect();
        push_row(ctx, &columns, &cells, kind, &mut batch);
      }
      Err(e) => {
        tracing::warn!(row = line + 1, error = %e, "unreadable row");
        ctx.record_dropped("unreadable row");
      }
    }
  }
  Ok(batch)
}

#[cfg(test)]
mod tests {
  use leadsync_core::{
    context::{PipelineConfig, RunContext},
    model::PriorityTier,
  };

  use crate::{RecordKind, parse_csv};

  fn ctx() -> RunContext { RunContext::new(PipelineConfig::default()).unwrap() }

  #[test]
  fn quoted_comma_stays_in_one_field() {
    let mut ctx = ctx();
    let input = "Company,Name,Title\n\"Acme, Inc.\",Jane Doe,VP of Engineering\n";
    let batch = parse_csv(&mut ctx, input.as_bytes(), RecordKind::Contact).unwrap();

    assert_eq!(batch.contacts.len(), 1);
    assert_eq!(batch.contacts[0].company, "Acme, Inc.");
    assert_eq!(batch.contacts[0].title.as_deref(), Some("VP of Engineering"));
  }

  #[test]
  fn doubled_quotes_and_embedded_newlines() {
    let mut ctx = ctx();
    let input = "Company,Name,Title\n\"Acme \"\"Rockets\"\", Inc.\",Jane Doe,\"VP,\nEngineering\"\n";
    let batch = parse_csv(&mut ctx, input.as_bytes(), RecordKind::Contact).unwrap();

    assert_eq!(batch.contacts.len(), 1);
    assert_eq!(ctx.report().dropped, 0);
    assert_eq!(batch.contacts[0].company, "Acme \"Rockets\", Inc.");
    assert_eq!(batch.contacts[0].title.as_deref(), Some("VP, Engineering"));
  }

  #[test]
  fn rows_missing_names_are_dropped_and_counted() {
    let mut ctx = ctx();
    let input = "\
company,name,title
Acme,Jane Doe,CTO
,Bob Smith,Engineer
Acme,,Analyst
";
    let batch = parse_csv(&mut ctx, input.as_bytes(), RecordKind::Contact).unwrap();

    assert_eq!(batch.contacts.len(), 1);
    assert_eq!(ctx.report().dropped, 2);
  }

  #[test]
  fn company_file_accepts_plain_name_column() {
    let mut ctx = ctx();
    let input = "Name,Website,Priority Tier\nAcme Corp,https://www.acme.com/,Tier 1\n";
    let batch = parse_csv(&mut ctx, input.as_bytes(), RecordKind::Company).unwrap();

    let acme = &batch.companies[0];
    assert_eq!(acme.name, "Acme Corp");
    assert_eq!(acme.domain.as_deref(), Some("acme.com"));
    assert_eq!(acme.priority_tier, Some(PriorityTier::Tier1));
  }

  #[test]
  fn first_and_last_name_columns_are_joined() {
    let mut ctx = ctx();
    let input = "First Name,Last Name,Company Name\nJane,Doe,Acme\n";
    let batch = parse_csv(&mut ctx, input.as_bytes(), RecordKind::Contact).unwrap();

    assert_eq!(batch.contacts[0].name, "Jane Doe");
  }

  #[test]
  fn short_rows_are_tolerated() {
    let mut ctx = ctx();
    let input = "company,name,title,email\nAcme,Jane Doe\n";
    let batch = parse_csv(&mut ctx, input.as_bytes(), RecordKind::Contact).unwrap();

    assert_eq!(batch.contacts.len(), 1);
    assert!(batch.contacts[0].title.is_none());
  }

  #[test]
  fn empty_input_yields_empty_batch() {
    let mut ctx = ctx();
    let batch = parse_csv(&mut ctx, "".as_bytes(), RecordKind::Contact).unwrap();
    assert!(batch.is_empty());
    assert_eq!(ctx.report().dropped, 0);
  }
}
