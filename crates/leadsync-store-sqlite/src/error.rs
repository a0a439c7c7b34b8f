//! Error type for `leadsync-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value the domain types do not accept.
  #[error("cannot decode {column} value {value:?}")]
  Decode { column: &'static str, value: String },

  /// An update named a record id that is not in the table.
  #[error("no {table} row with id {id}")]
  MissingRow { table: &'static str, id: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
