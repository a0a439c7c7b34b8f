//! JSON input.
//!
//! Exports from CRMs and enrichment tools rarely agree on shape. We accept a
//! bare array of objects, or an object whose well-known keys hold such arrays.
//! Each object is flattened to scalar cells (one level of `properties`
//! nesting is lifted) and then read like a delimited row.

use leadsync_core::{context::RunContext, model::IngestionBatch};
use serde_json::{Map, Value};

use crate::{Error, RecordKind, Result, adapt_columns, push_row};

const CONTACT_KEYS: &[&str] = &["contacts", "people", "leads", "results", "data"];
const COMPANY_KEYS: &[&str] = &["companies", "accounts", "organizations"];

pub(crate) fn parse(
  ctx: &mut RunContext,
  input: &str,
  default_kind: RecordKind,
) -> Result<IngestionBatch> {
  let document: Value = serde_json::from_str(input)?;
  let mut batch = IngestionBatch::default();

  match document {
    Value::Array(items) => read_items(ctx, &items, default_kind, &mut batch),
    Value::Object(map) => {
      let companies = first_array(&map, COMPANY_KEYS);
      let contacts = first_array(&map, CONTACT_KEYS);
      if companies.is_none() && contacts.is_none() {
        return Err(Error::UnsupportedDocument(
          "no array of companies or contacts found".into(),
        ));
      }
      if let Some(items) = companies {
        read_items(ctx, items, RecordKind::Company, &mut batch);
      }
      if let Some(items) = contacts {
        read_items(ctx, items, RecordKind::Contact, &mut batch);
      }
    }
    other => {
      return Err(Error::UnsupportedDocument(format!(
        "expected an array or object, found {}",
        type_name(&other)
      )));
    }
  }
  Ok(batch)
}

fn first_array<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a [Value]> {
  keys
    .iter()
    .find_map(|k| map.get(*k).and_then(Value::as_array))
    .map(Vec::as_slice)
}

fn read_items(
  ctx: &mut RunContext,
  items: &[Value],
  kind: RecordKind,
  batch: &mut IngestionBatch,
) {
  let rows: Vec<Option<Vec<(String, String)>>> = items
    .iter()
    .map(|item| item.as_object().map(flatten))
    .collect();

  // The union of keys, in first-appearance order, plays the header row.
  let mut headers: Vec<String> = Vec::new();
  for (key, _) in rows.iter().flatten().flatten() {
    if !headers.contains(key) {
      headers.push(key.clone());
    }
  }
  let columns = adapt_columns(ctx.config().aliases.resolve(&headers), kind);

  for row in rows {
    let Some(cells) = row else {
      ctx.record_dropped("array element is not an object");
      continue;
    };
    let mut line = vec![String::new(); headers.len()];
    for (key, value) in cells {
      if let Some(idx) = headers.iter().position(|h| *h == key) {
        line[idx] = value;
      }
    }
    push_row(ctx, &columns, &line, kind, batch);
  }
}

/// Scalar fields of `object`, with a nested `properties` object lifted to the
/// top level. Top-level keys win over lifted ones.
fn flatten(object: &Map<String, Value>) -> Vec<(String, String)> {
  let mut cells: Vec<(String, String)> = object
    .iter()
    .filter_map(|(k, v)| scalar(v).map(|s| (k.clone(), s)))
    .collect();

  if let Some(Value::Object(props)) = object.get("properties") {
    for (k, v) in props {
      if cells.iter().any(|(existing, _)| existing == k) {
        continue;
      }
      if let Some(s) = scalar(v) {
        cells.push((k.clone(), s));
      }
    }
  }
  cells
}

fn scalar(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
