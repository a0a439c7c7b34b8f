//! Error types for `leadsync-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Invalid or missing configuration; raised before any record is read.
  #[error("configuration error: {0}")]
  Config(String),

  /// The destination snapshot could not be read.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("timed out after {secs}s waiting for {operation}")]
  Timeout { operation: &'static str, secs: u64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
