//! The `DestinationStore` trait — the only surface of a CRM or database the
//! pipeline touches.
//!
//! Implemented by `leadsync-store-sqlite` and `leadsync-hubspot`. The
//! pipeline reads one snapshot per run, then issues bulk writes one chunk at a
//! time; each call is treated as atomic by the caller.

use std::future::Future;

use crate::model::{Company, Contact, NewContact, RecordId, Stored};

/// Abstraction over a destination store backend.
///
/// All methods return `Send` futures so implementations can be driven from a
/// multi-threaded runtime.
pub trait DestinationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Snapshot ──────────────────────────────────────────────────────────

  /// Every stored company with its key fields and source tag.
  fn list_companies(
    &self,
  ) -> impl Future<Output = Result<Vec<Stored<Company>>, Self::Error>> + Send + '_;

  /// Every stored contact. `record.company` must hold the owning company's
  /// name so the contact key can be computed.
  fn list_contacts(
    &self,
  ) -> impl Future<Output = Result<Vec<Stored<Contact>>, Self::Error>> + Send + '_;

  // ── Bulk writes ───────────────────────────────────────────────────────

  /// Create `records` and return their identifiers in input order.
  fn create_companies<'a>(
    &'a self,
    records: &'a [Company],
  ) -> impl Future<Output = Result<Vec<RecordId>, Self::Error>> + Send + 'a;

  /// Overwrite the stored companies named by `records[*].id`.
  fn update_companies<'a>(
    &'a self,
    records: &'a [Stored<Company>],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Create `records` and return their identifiers in input order.
  fn create_contacts<'a>(
    &'a self,
    records: &'a [NewContact],
  ) -> impl Future<Output = Result<Vec<RecordId>, Self::Error>> + Send + 'a;

  /// Overwrite the stored contacts named by `records[*].id`. The owning
  /// company link is left as is.
  fn update_contacts<'a>(
    &'a self,
    records: &'a [Stored<Contact>],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
