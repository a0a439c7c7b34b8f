//! Pipeline executor — snapshot, plan, chunked writes, then events.
//!
//! Everything runs on the caller's task, one external call at a time. Each
//! call is bounded by the configured timeout; a failed or timed-out chunk is
//! recorded in the report and the run moves on to the next chunk.

use std::{future::Future, time::Duration};

use tracing::{info, warn};

use crate::{
  Error, Result,
  context::{ChunkFailure, EntityKind, RunContext, RunEvent, RunReport, WriteOp},
  dedup::{self, CompanyDirectory, Plan},
  model::{Company, Contact, IngestionBatch, NewContact, PriorityTier},
  notify::Notifier,
  store::DestinationStore,
};

/// Run the whole pipeline for one batch and return its report.
///
/// Only a failure to read the destination snapshot is returned as an error;
/// write failures are recorded in the report instead.
pub async fn run<S, N>(
  mut ctx: RunContext,
  store: &S,
  notifier: Option<&N>,
  mut batch: IngestionBatch,
) -> Result<RunReport>
where
  S: DestinationStore,
  N: Notifier,
{
  batch.apply_default_source();
  let timeout = ctx.config().call_timeout;

  info!(
    companies = batch.companies.len(),
    contacts = batch.contacts.len(),
    "fetching destination snapshot"
  );
  let stored_companies =
    bounded(timeout, "company snapshot", store.list_companies()).await?;
  let stored_contacts =
    bounded(timeout, "contact snapshot", store.list_contacts()).await?;

  let company_plan = dedup::plan_companies(&mut ctx, &stored_companies, batch.companies);
  let mut directory = CompanyDirectory::build(&stored_companies, &company_plan);
  let contact_plan =
    dedup::plan_contacts(&mut ctx, &directory, &stored_contacts, batch.contacts);

  info!(
    company_inserts = company_plan.inserts.len(),
    company_updates = company_plan.updates.len(),
    contact_inserts = contact_plan.inserts.len(),
    contact_updates = contact_plan.updates.len(),
    "plan ready"
  );

  if ctx.config().dry_run {
    let report = ctx.report_mut();
    report.companies.inserted += company_plan.inserts.len();
    report.companies.updated += company_plan.updates.len();
    report.contacts.inserted += contact_plan.inserts.len();
    report.contacts.updated += contact_plan.updates.len();
    return Ok(ctx.into_report());
  }

  write_companies(&mut ctx, store, company_plan, &mut directory).await;
  write_contacts(&mut ctx, store, contact_plan, &directory).await;

  if let Some(notifier) = notifier {
    flush_events(&mut ctx, notifier).await;
  } else {
    let dropped = ctx.take_events();
    if !dropped.is_empty() {
      info!(events = dropped.len(), "no notifier configured; events discarded");
    }
  }

  Ok(ctx.into_report())
}

// ─── Bounded calls ───────────────────────────────────────────────────────────

async fn bounded<T, E>(
  timeout: Duration,
  operation: &'static str,
  call: impl Future<Output = Result<T, E>>,
) -> Result<T>
where
  E: std::error::Error + Send + Sync + 'static,
{
  match tokio::time::timeout(timeout, call).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(Error::Store(Box::new(e))),
    Err(_) => Err(Error::Timeout {
      operation,
      secs: timeout.as_secs(),
    }),
  }
}

/// Await one chunk call, flattening errors and timeouts into a message.
async fn attempt<T, E>(
  timeout: Duration,
  call: impl Future<Output = Result<T, E>>,
) -> Result<T, String>
where
  E: std::error::Error,
{
  match tokio::time::timeout(timeout, call).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(e.to_string()),
    Err(_) => Err(format!("timed out after {}s", timeout.as_secs_f32())),
  }
}

fn record_failure(
  ctx: &mut RunContext,
  entity: EntityKind,
  operation: WriteOp,
  index: usize,
  records: usize,
  error: String,
) {
  warn!(%entity, %operation, chunk = index, records, %error, "chunk failed");
  ctx.report_mut().counts_mut(entity).failed += records;
  ctx.report_mut().failed_chunks.push(ChunkFailure {
    entity,
    operation,
    index,
    records,
    error,
  });
}

// ─── Writes ──────────────────────────────────────────────────────────────────

async fn write_companies<S: DestinationStore>(
  ctx: &mut RunContext,
  store: &S,
  plan: Plan<Company>,
  directory: &mut CompanyDirectory,
) {
  let chunk_size = ctx.config().chunk_size;
  let timeout = ctx.config().call_timeout;

  for (index, chunk) in plan.inserts.chunks(chunk_size).enumerate() {
    match attempt(timeout, store.create_companies(chunk)).await {
      Ok(ids) if ids.len() == chunk.len() => {
        for (company, id) in chunk.iter().zip(ids) {
          directory.assign_id(&company.key(), id);
          if company.priority_tier == Some(PriorityTier::Tier1) {
            ctx.emit(RunEvent::PriorityCompany {
              name: company.name.clone(),
              tier: PriorityTier::Tier1,
            });
          }
        }
        ctx.report_mut().companies.inserted += chunk.len();
        info!(chunk = index, records = chunk.len(), "companies created");
      }
      Ok(ids) => record_failure(
        ctx,
        EntityKind::Company,
        WriteOp::Create,
        index,
        chunk.len(),
        format!("store returned {} ids for {} records", ids.len(), chunk.len()),
      ),
      Err(error) => record_failure(
        ctx,
        EntityKind::Company,
        WriteOp::Create,
        index,
        chunk.len(),
        error,
      ),
    }
  }

  for (index, chunk) in plan.updates.chunks(chunk_size).enumerate() {
    match attempt(timeout, store.update_companies(chunk)).await {
      Ok(()) => {
        ctx.report_mut().companies.updated += chunk.len();
        info!(chunk = index, records = chunk.len(), "companies updated");
      }
      Err(error) => record_failure(
        ctx,
        EntityKind::Company,
        WriteOp::Update,
        index,
        chunk.len(),
        error,
      ),
    }
  }
}

async fn write_contacts<S: DestinationStore>(
  ctx: &mut RunContext,
  store: &S,
  plan: Plan<Contact>,
  directory: &CompanyDirectory,
) {
  let chunk_size = ctx.config().chunk_size;
  let timeout = ctx.config().call_timeout;
  let threshold = ctx.config().notify_score_threshold;

  let mut ready = Vec::with_capacity(plan.inserts.len());
  for contact in plan.inserts {
    match directory.id_for(&contact.company) {
      Some(company_id) => ready.push(NewContact {
        company_id: company_id.clone(),
        contact,
      }),
      None => {
        warn!(
          contact = %contact.name,
          company = %contact.company,
          "owning company was not written; contact skipped"
        );
        ctx.report_mut().contacts.orphaned += 1;
      }
    }
  }

  for (index, chunk) in ready.chunks(chunk_size).enumerate() {
    match attempt(timeout, store.create_contacts(chunk)).await {
      Ok(ids) if ids.len() == chunk.len() => {
        for new in chunk.iter().filter(|n| n.contact.persona_score >= threshold) {
          ctx.emit(RunEvent::HighPriorityContact {
            name:          new.contact.name.clone(),
            company:       new.contact.company.clone(),
            title:         new.contact.title.clone(),
            persona_score: new.contact.persona_score,
          });
        }
        ctx.report_mut().contacts.inserted += chunk.len();
        info!(chunk = index, records = chunk.len(), "contacts created");
      }
      Ok(ids) => record_failure(
        ctx,
        EntityKind::Contact,
        WriteOp::Create,
        index,
        chunk.len(),
        format!("store returned {} ids for {} records", ids.len(), chunk.len()),
      ),
      Err(error) => record_failure(
        ctx,
        EntityKind::Contact,
        WriteOp::Create,
        index,
        chunk.len(),
        error,
      ),
    }
  }

  for (index, chunk) in plan.updates.chunks(chunk_size).enumerate() {
    match attempt(timeout, store.update_contacts(chunk)).await {
      Ok(()) => {
        ctx.report_mut().contacts.updated += chunk.len();
        info!(chunk = index, records = chunk.len(), "contacts updated");
      }
      Err(error) => record_failure(
        ctx,
        EntityKind::Contact,
        WriteOp::Update,
        index,
        chunk.len(),
        error,
      ),
    }
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

async fn flush_events<N: Notifier>(ctx: &mut RunContext, notifier: &N) {
  let timeout = ctx.config().call_timeout;
  for event in ctx.take_events() {
    match attempt(timeout, notifier.notify(&event)).await {
      Ok(()) => ctx.report_mut().notifications_sent += 1,
      Err(error) => {
        warn!(%error, event = %event.message(), "notification not delivered");
        ctx.report_mut().notifications_failed += 1;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use thiserror::Error;

  use super::*;
  use crate::{
    context::PipelineConfig,
    model::{JobLevel, RecordId, Stored},
  };

  #[derive(Debug, Error)]
  #[error("{0}")]
  struct FakeError(String);

  #[derive(Default)]
  struct State {
    companies: Vec<Stored<Company>>,
    contacts:  Vec<(RecordId, Stored<Contact>)>,
    next_id:   usize,
  }

  /// In-memory store that can be told to fail or stall specific calls.
  #[derive(Default)]
  struct FakeStore {
    state:              Mutex<State>,
    fail_company_write: bool,
    stall_contacts:     Option<Duration>,
    create_calls:       AtomicUsize,
  }

  impl FakeStore {
    fn next_id(state: &mut State) -> RecordId {
      state.next_id += 1;
      RecordId::new(format!("id-{}", state.next_id))
    }

    fn contact_count(&self) -> usize { self.state.lock().unwrap().contacts.len() }
  }

  impl DestinationStore for FakeStore {
    type Error = FakeError;

    async fn list_companies(&self) -> Result<Vec<Stored<Company>>, FakeError> {
      Ok(self.state.lock().unwrap().companies.clone())
    }

    async fn list_contacts(&self) -> Result<Vec<Stored<Contact>>, FakeError> {
      let state = self.state.lock().unwrap();
      Ok(state.contacts.iter().map(|(_, c)| c.clone()).collect())
    }

    async fn create_companies(&self, records: &[Company]) -> Result<Vec<RecordId>, FakeError> {
      self.create_calls.fetch_add(1, Ordering::SeqCst);
      if self.fail_company_write {
        return Err(FakeError("503 service unavailable".into()));
      }
      let mut state = self.state.lock().unwrap();
      let mut ids = Vec::new();
      for record in records {
        let id = Self::next_id(&mut state);
        state.companies.push(Stored {
          id:     id.clone(),
          record: record.clone(),
        });
        ids.push(id);
      }
      Ok(ids)
    }

    async fn update_companies(&self, records: &[Stored<Company>]) -> Result<(), FakeError> {
      let mut state = self.state.lock().unwrap();
      for update in records {
        if let Some(slot) = state.companies.iter_mut().find(|c| c.id == update.id) {
          slot.record = update.record.clone();
        }
      }
      Ok(())
    }

    async fn create_contacts(&self, records: &[NewContact]) -> Result<Vec<RecordId>, FakeError> {
      self.create_calls.fetch_add(1, Ordering::SeqCst);
      if let Some(stall) = self.stall_contacts {
        tokio::time::sleep(stall).await;
      }
      let mut state = self.state.lock().unwrap();
      let mut ids = Vec::new();
      for record in records {
        let id = Self::next_id(&mut state);
        state.contacts.push((record.company_id.clone(), Stored {
          id:     id.clone(),
          record: record.contact.clone(),
        }));
        ids.push(id);
      }
      Ok(ids)
    }

    async fn update_contacts(&self, records: &[Stored<Contact>]) -> Result<(), FakeError> {
      let mut state = self.state.lock().unwrap();
      for update in records {
        if let Some((_, slot)) = state.contacts.iter_mut().find(|(_, c)| c.id == update.id) {
          slot.record = update.record.clone();
        }
      }
      Ok(())
    }
  }

  #[derive(Default)]
  struct RecordingNotifier {
    fail:     bool,
    messages: Mutex<Vec<String>>,
  }

  impl Notifier for RecordingNotifier {
    type Error = FakeError;

    async fn notify(&self, event: &RunEvent) -> Result<(), FakeError> {
      if self.fail {
        return Err(FakeError("webhook returned 500".into()));
      }
      self.messages.lock().unwrap().push(event.message());
      Ok(())
    }
  }

  fn ctx_with(config: PipelineConfig) -> RunContext { RunContext::new(config).unwrap() }

  fn ctx() -> RunContext { ctx_with(PipelineConfig::default()) }

  fn batch() -> IngestionBatch {
    let mut batch = IngestionBatch::with_source("Deep Research");
    batch.companies = vec![
      Company {
        priority_tier: Some(PriorityTier::Tier1),
        ..Company::new("Acme Inc")
      },
      Company::new("Globex"),
    ];
    batch.contacts = vec![
      Contact {
        title: Some("VP of Engineering".into()),
        ..Contact::new("Jane Doe", "Acme Inc")
      },
      Contact::new("Jane Doe", "acme inc"),
      Contact {
        title: Some("Analyst".into()),
        ..Contact::new("Hank Scorpio", "Globex")
      },
      Contact::new("Sam Poe", "Initech"),
    ];
    batch
  }

  #[tokio::test]
  async fn first_run_inserts_and_reports() {
    let store = FakeStore::default();
    let notifier = RecordingNotifier::default();

    let report = run(ctx(), &store, Some(&notifier), batch()).await.unwrap();

    assert_eq!(report.companies.inserted, 2);
    assert_eq!(report.contacts.inserted, 2);
    assert_eq!(report.contacts.skipped, 1);
    assert_eq!(report.contacts.orphaned, 1);
    assert!(report.is_success());

    let state = store.state.lock().unwrap();
    let jane = state
      .contacts
      .iter()
      .find(|(_, c)| c.record.name == "Jane Doe")
      .unwrap();
    assert_eq!(jane.1.record.job_level, JobLevel::Vp);
    assert_eq!(jane.1.record.source.as_deref(), Some("Deep Research"));
    let acme_id = &state
      .companies
      .iter()
      .find(|c| c.record.name == "Acme Inc")
      .unwrap()
      .id;
    assert_eq!(&jane.0, acme_id);
  }

  #[tokio::test]
  async fn second_run_is_idempotent() {
    let store = FakeStore::default();
    run(ctx(), &store, None::<&RecordingNotifier>, batch()).await.unwrap();
    let second = run(ctx(), &store, None::<&RecordingNotifier>, batch())
      .await
      .unwrap();

    assert_eq!(second.companies.inserted, 0);
    assert_eq!(second.contacts.inserted, 0);
    assert_eq!(second.companies.updated, 0);
    assert_eq!(second.contacts.updated, 0);
    assert_eq!(second.companies.skipped, 2);
    assert_eq!(second.contacts.skipped, 3);
    assert_eq!(store.contact_count(), 2);
  }

  #[tokio::test]
  async fn events_are_flushed_after_writes() {
    let store = FakeStore::default();
    let notifier = RecordingNotifier::default();
    let report = run(ctx(), &store, Some(&notifier), batch()).await.unwrap();

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(report.notifications_sent, 2);
    assert_eq!(messages[0], "New Tier1 company: Acme Inc");
    assert!(messages[1].starts_with("New high-priority contact: Jane Doe"));
  }

  #[tokio::test]
  async fn notification_failure_never_fails_the_run() {
    let store = FakeStore::default();
    let notifier = RecordingNotifier {
      fail: true,
      ..RecordingNotifier::default()
    };
    let report = run(ctx(), &store, Some(&notifier), batch()).await.unwrap();
    assert_eq!(report.notifications_failed, 2);
    assert_eq!(report.exit_code(), 0);
  }

  #[tokio::test]
  async fn failed_company_chunk_orphans_its_contacts_and_continues() {
    let store = FakeStore {
      fail_company_write: true,
      ..FakeStore::default()
    };
    let config = PipelineConfig {
      chunk_size: 1,
      ..PipelineConfig::default()
    };
    let report = run(ctx_with(config), &store, None::<&RecordingNotifier>, batch())
      .await
      .unwrap();

    // Both single-record company chunks were attempted and failed.
    assert_eq!(report.failed_chunks.len(), 2);
    assert_eq!(report.companies.failed, 2);
    assert_eq!(report.failed_chunks[1].index, 1);
    // Jane and Hank lost their owning companies; Sam never had one.
    assert_eq!(report.contacts.orphaned, 3);
    assert_eq!(report.exit_code(), 1);
  }

  #[tokio::test]
  async fn stalled_chunk_times_out_and_is_recorded() {
    let store = FakeStore {
      stall_contacts: Some(Duration::from_millis(500)),
      ..FakeStore::default()
    };
    let config = PipelineConfig {
      call_timeout: Duration::from_millis(50),
      ..PipelineConfig::default()
    };
    let report = run(ctx_with(config), &store, None::<&RecordingNotifier>, batch())
      .await
      .unwrap();

    assert_eq!(report.companies.inserted, 2);
    assert_eq!(report.failed_chunks.len(), 1);
    let failure = &report.failed_chunks[0];
    assert_eq!(failure.entity, EntityKind::Contact);
    assert_eq!(failure.operation, WriteOp::Create);
    assert!(failure.error.contains("timed out"));
  }

  #[tokio::test]
  async fn dry_run_writes_nothing() {
    let store = FakeStore::default();
    let config = PipelineConfig {
      dry_run: true,
      ..PipelineConfig::default()
    };
    let report = run(ctx_with(config), &store, None::<&RecordingNotifier>, batch())
      .await
      .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.companies.inserted, 2);
    assert_eq!(report.contacts.inserted, 2);
    assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn higher_priority_source_updates_stored_contact() {
    let store = FakeStore::default();
    run(ctx(), &store, None::<&RecordingNotifier>, batch()).await.unwrap();

    let mut upgrade = IngestionBatch::with_source("Product Signup");
    upgrade.contacts = vec![Contact {
      email: Some("jane@acme.com".into()),
      ..Contact::new("JANE DOE", "ACME INC")
    }];
    let report = run(ctx(), &store, None::<&RecordingNotifier>, upgrade)
      .await
      .unwrap();

    assert_eq!(report.contacts.updated, 1);
    let state = store.state.lock().unwrap();
    let jane = &state
      .contacts
      .iter()
      .find(|(_, c)| c.record.name == "Jane Doe")
      .unwrap()
      .1
      .record;
    assert_eq!(jane.email.as_deref(), Some("jane@acme.com"));
    assert_eq!(jane.title.as_deref(), Some("VP of Engineering"));
    assert_eq!(jane.source.as_deref(), Some("Product Signup"));
  }
}
