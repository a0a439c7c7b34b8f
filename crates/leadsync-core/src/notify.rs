//! The `Notifier` trait for fire-and-forget event delivery.

use std::future::Future;

use crate::context::RunEvent;

/// Delivers one event per call. Failures are reported to the caller, which
/// logs and counts them; they never fail a run.
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn notify<'a>(
    &'a self,
    event: &'a RunEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
