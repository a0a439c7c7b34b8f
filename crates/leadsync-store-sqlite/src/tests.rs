//! Integration tests for `SqliteStore` against an in-memory database.

use std::convert::Infallible;

use leadsync_core::{
  context::{PipelineConfig, RunContext, RunEvent},
  model::{
    Company, Contact, JobLevel, NewContact, PriorityTier, RecordId, RoleType,
    SignalStrength, Stored,
  },
  notify::Notifier,
  pipeline,
  store::DestinationStore,
};
use leadsync_ingest::{RecordKind, parse_csv};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

struct Quiet;

impl Notifier for Quiet {
  type Error = Infallible;

  async fn notify(&self, _event: &RunEvent) -> Result<(), Infallible> { Ok(()) }
}

fn acme() -> Company {
  Company {
    domain: Some("acme.com".into()),
    priority_tier: Some(PriorityTier::Tier1),
    signal_strength: Some(SignalStrength::High),
    source: Some("Deep Research".into()),
    ..Company::new("Acme Inc")
  }
}

fn jane(company: &str) -> Contact {
  let mut contact = Contact {
    title: Some("VP of Engineering".into()),
    linkedin_url: Some("https://www.linkedin.com/in/jane-doe".into()),
    ..Contact::new("Jane Doe", company)
  };
  contact.classify(Some(PriorityTier::Tier1));
  contact
}

// ─── Companies ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_list_companies() {
  let s = store().await;

  let ids = s.create_companies(&[acme(), Company::new("Globex")]).await.unwrap();
  assert_eq!(ids.len(), 2);

  let listed = s.list_companies().await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].id, ids[0]);
  assert_eq!(listed[0].record, acme());
  assert_eq!(listed[1].record.name, "Globex");
  assert!(listed[1].record.priority_tier.is_none());
}

#[tokio::test]
async fn duplicate_name_key_rolls_back_whole_chunk() {
  let s = store().await;
  s.create_companies(&[acme()]).await.unwrap();

  let result = s
    .create_companies(&[Company::new("Initech"), Company::new("ACME  inc")])
    .await;
  assert!(matches!(result, Err(Error::Database(_))));

  let names: Vec<String> = s
    .list_companies()
    .await
    .unwrap()
    .into_iter()
    .map(|c| c.record.name)
    .collect();
  assert_eq!(names, vec!["Acme Inc"]);
}

#[tokio::test]
async fn update_company_keeps_id() {
  let s = store().await;
  let id = s.create_companies(&[acme()]).await.unwrap().remove(0);

  let mut record = acme();
  record.status = Some("engaged".into());
  s.update_companies(&[Stored { id: id.clone(), record }]).await.unwrap();

  let listed = s.list_companies().await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id, id);
  assert_eq!(listed[0].record.status.as_deref(), Some("engaged"));
}

#[tokio::test]
async fn update_unknown_company_fails_and_rolls_back() {
  let s = store().await;
  let id = s.create_companies(&[acme()]).await.unwrap().remove(0);

  let mut changed = acme();
  changed.status = Some("churned".into());
  let result = s
    .update_companies(&[
      Stored { id, record: changed },
      Stored {
        id:     RecordId::new("00000000-0000-0000-0000-000000000000"),
        record: Company::new("Ghost"),
      },
    ])
    .await;
  assert!(matches!(result, Err(Error::MissingRow { table: "companies", .. })));

  let listed = s.list_companies().await.unwrap();
  assert!(listed[0].record.status.is_none());
}

// ─── Contacts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn contacts_list_with_owner_name() {
  let s = store().await;
  let company_id = s.create_companies(&[acme()]).await.unwrap().remove(0);

  let ids = s
    .create_contacts(&[NewContact { company_id, contact: jane("acme inc") }])
    .await
    .unwrap();

  let listed = s.list_contacts().await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id, ids[0]);

  let contact = &listed[0].record;
  assert_eq!(contact.company, "Acme Inc");
  assert_eq!(contact.job_level, JobLevel::Vp);
  assert_eq!(contact.role_type, RoleType::DecisionMaker);
  assert_eq!(contact.persona_score, jane("Acme Inc").persona_score);
}

#[tokio::test]
async fn contact_requires_existing_company() {
  let s = store().await;
  let result = s
    .create_contacts(&[NewContact {
      company_id: RecordId::new("00000000-0000-0000-0000-000000000000"),
      contact:    jane("Nowhere"),
    }])
    .await;
  assert!(matches!(result, Err(Error::Database(_))));
  assert!(s.list_contacts().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_contact_rewrites_derived_fields() {
  let s = store().await;
  let company_id = s.create_companies(&[acme()]).await.unwrap().remove(0);
  let id = s
    .create_contacts(&[NewContact { company_id, contact: jane("Acme Inc") }])
    .await
    .unwrap()
    .remove(0);

  let mut record = jane("Acme Inc");
  record.title = Some("Chief Technology Officer".into());
  record.classify(Some(PriorityTier::Tier1));
  s.update_contacts(&[Stored { id, record }]).await.unwrap();

  let listed = s.list_contacts().await.unwrap();
  assert_eq!(listed[0].record.job_level, JobLevel::Executive);
  assert_eq!(listed[0].record.title.as_deref(), Some("Chief Technology Officer"));
}

#[tokio::test]
async fn last_updated_tracks_writes() {
  let s = store().await;
  assert!(s.last_updated().await.unwrap().is_none());

  s.create_companies(&[acme()]).await.unwrap();
  assert!(s.last_updated().await.unwrap().is_some());
}

// ─── Full pipeline ───────────────────────────────────────────────────────────

const COMPANIES: &str = "\
Company Name,Website,Priority Tier,Signal
\"Acme, Inc.\",https://www.acme.com/,Tier 1,High
Globex,globex.io,Tier 3,Low
";

const CONTACTS: &str = "\
Name,Company,Title,LinkedIn URL
Jane Doe,\"Acme, Inc.\",VP of Engineering,https://www.linkedin.com/in/jane-doe/
Bob Smith,Globex,Data Analyst,
Carol White,,Engineer,
";

async fn import(s: &SqliteStore) -> leadsync_core::context::RunReport {
  let mut ctx = RunContext::new(PipelineConfig::default()).unwrap();
  let mut batch = parse_csv(&mut ctx, COMPANIES.as_bytes(), RecordKind::Company).unwrap();
  batch.extend(parse_csv(&mut ctx, CONTACTS.as_bytes(), RecordKind::Contact).unwrap());
  pipeline::run(ctx, s, Some(&Quiet), batch).await.unwrap()
}

#[tokio::test]
async fn pipeline_imports_csv_into_sqlite() {
  let s = store().await;
  let report = import(&s).await;

  assert_eq!(report.companies.inserted, 2);
  assert_eq!(report.contacts.inserted, 2);
  assert_eq!(report.dropped, 1);
  assert_eq!(report.exit_code(), 0);

  let contacts = s.list_contacts().await.unwrap();
  let jane = contacts
    .iter()
    .find(|c| c.record.name == "Jane Doe")
    .expect("jane stored");
  assert_eq!(jane.record.company, "Acme, Inc.");
  assert_eq!(jane.record.persona_score, 88);
}

#[tokio::test]
async fn pipeline_rerun_is_idempotent() {
  let s = store().await;
  import(&s).await;
  let report = import(&s).await;

  assert_eq!(report.companies.inserted, 0);
  assert_eq!(report.companies.updated, 0);
  assert_eq!(report.companies.skipped, 2);
  assert_eq!(report.contacts.inserted, 0);
  assert_eq!(report.contacts.skipped, 2);
  assert_eq!(s.list_companies().await.unwrap().len(), 2);
  assert_eq!(s.list_contacts().await.unwrap().len(), 2);
}
