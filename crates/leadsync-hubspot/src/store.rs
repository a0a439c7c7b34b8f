//! [`HubSpotStore`] — the CRM implementation of [`DestinationStore`].

use std::time::Duration;

use leadsync_core::{
  model::{Company, CompanyKey, Contact, ContactKey, NewContact, RecordId, Stored},
  store::DestinationStore,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
  Error, Result,
  properties::{
    COMPANY_PROPERTIES, CONTACT_PROPERTIES, company_from_properties, company_properties,
    contact_from_properties, contact_properties,
  },
  wire::{
    Association, BatchCreate, BatchResult, BatchUpdate, CreateInput, Object, Page,
    UpdateInput,
  },
};

pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";

/// Largest page the list endpoints hand out.
const PAGE_LIMIT: &str = "100";

/// Connection settings for the CRM API.
#[derive(Debug, Clone)]
pub struct HubSpotConfig {
  pub base_url: String,
  /// Private-app access token, sent as a bearer token.
  pub token:    String,
  pub timeout:  Duration,
}

/// A leadsync destination backed by the HubSpot CRM v3 objects API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HubSpotStore {
  client: Client,
  config: HubSpotConfig,
}

impl HubSpotStore {
  pub fn new(config: HubSpotConfig) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/crm/v3/objects{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder { req.bearer_auth(&self.config.token) }

  async fn check(method: &'static str, path: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Status {
      method,
      path: path.to_owned(),
      status: status.as_u16(),
      body,
    })
  }

  /// `GET /crm/v3/objects/<object>`, following `after` cursors to the end.
  async fn list_all(&self, object: &str, properties: &[&str]) -> Result<Vec<Object>> {
    let path = format!("/{object}");
    let props = properties.join(",");
    let mut after: Option<String> = None;
    let mut objects = Vec::new();

    loop {
      let mut query = vec![("limit", PAGE_LIMIT), ("properties", props.as_str())];
      if let Some(cursor) = after.as_deref() {
        query.push(("after", cursor));
      }
      let resp = self
        .auth(self.client.get(self.url(&path)))
        .query(&query)
        .send()
        .await?;
      let page: Page = Self::check("GET", &path, resp).await?.json().await?;

      let next = page.next_after().map(str::to_owned);
      objects.extend(page.results);
      debug!(object, fetched = objects.len(), "listed page");
      match next {
        Some(cursor) => after = Some(cursor),
        None => break,
      }
    }
    Ok(objects)
  }

  async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
    let resp = self
      .auth(self.client.post(self.url(path)))
      .json(body)
      .send()
      .await?;
    Ok(Self::check("POST", path, resp).await?.json().await?)
  }

  /// `POST` a batch whose response body is not needed.
  async fn post_discard<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
    let resp = self
      .auth(self.client.post(self.url(path)))
      .json(body)
      .send()
      .await?;
    Self::check("POST", path, resp).await?;
    Ok(())
  }
}

/// The batch-create endpoint does not promise to echo results in input
/// order, so ids are matched back to inputs by dedup key.
pub(crate) fn align_ids<K: PartialEq>(
  inputs: &[K],
  mut results: Vec<(Option<K>, String)>,
) -> Result<Vec<RecordId>> {
  if results.len() != inputs.len() {
    return Err(Error::UnexpectedResponse(format!(
      "{} results for {} inputs",
      results.len(),
      inputs.len()
    )));
  }

  let mut ids = Vec::with_capacity(inputs.len());
  for key in inputs {
    let pos = results
      .iter()
      .position(|(k, _)| k.as_ref() == Some(key))
      .ok_or_else(|| Error::UnexpectedResponse("created object not found in response".into()))?;
    ids.push(RecordId::new(results.swap_remove(pos).1));
  }
  Ok(ids)
}

fn stored<T>(objects: Vec<Object>, decode: fn(&Object) -> Option<T>, object: &str) -> Vec<Stored<T>> {
  let mut out = Vec::with_capacity(objects.len());
  for obj in &objects {
    match decode(obj) {
      Some(record) => out.push(Stored { id: RecordId::new(obj.id.clone()), record }),
      None => warn!(object, id = %obj.id, "stored object lacks a name; ignored"),
    }
  }
  out
}

// ─── DestinationStore impl ───────────────────────────────────────────────────

impl DestinationStore for HubSpotStore {
  type Error = Error;

  async fn list_companies(&self) -> Result<Vec<Stored<Company>>> {
    let objects = self.list_all("companies", COMPANY_PROPERTIES).await?;
    Ok(stored(objects, |o| company_from_properties(&o.properties), "company"))
  }

  async fn list_contacts(&self) -> Result<Vec<Stored<Contact>>> {
    let objects = self.list_all("contacts", CONTACT_PROPERTIES).await?;
    Ok(stored(objects, |o| contact_from_properties(&o.properties), "contact"))
  }

  async fn create_companies(&self, records: &[Company]) -> Result<Vec<RecordId>> {
    let body = BatchCreate {
      inputs: records
        .iter()
        .map(|c| CreateInput {
          properties:   company_properties(c),
          associations: Vec::new(),
        })
        .collect(),
    };
    let result: BatchResult = self.post("/companies/batch/create", &body).await?;

    let keys: Vec<CompanyKey> = records.iter().map(Company::key).collect();
    let results = result
      .results
      .into_iter()
      .map(|o| (company_from_properties(&o.properties).map(|c| c.key()), o.id))
      .collect();
    align_ids(&keys, results)
  }

  async fn update_companies(&self, records: &[Stored<Company>]) -> Result<()> {
    let body = BatchUpdate {
      inputs: records
        .iter()
        .map(|s| UpdateInput {
          id:         s.id.0.clone(),
          properties: company_properties(&s.record),
        })
        .collect(),
    };
    self.post_discard("/companies/batch/update", &body).await
  }

  async fn create_contacts(&self, records: &[NewContact]) -> Result<Vec<RecordId>> {
    let body = BatchCreate {
      inputs: records
        .iter()
        .map(|r| CreateInput {
          properties:   contact_properties(&r.contact),
          associations: vec![Association::primary_company(r.company_id.as_str())],
        })
        .collect(),
    };
    let result: BatchResult = self.post("/contacts/batch/create", &body).await?;

    let keys: Vec<ContactKey> = records.iter().map(|r| r.contact.key()).collect();
    let results = result
      .results
      .into_iter()
      .map(|o| (contact_from_properties(&o.properties).map(|c| c.key()), o.id))
      .collect();
    align_ids(&keys, results)
  }

  async fn update_contacts(&self, records: &[Stored<Contact>]) -> Result<()> {
    let body = BatchUpdate {
      inputs: records
        .iter()
        .map(|s| UpdateInput {
          id:         s.id.0.clone(),
          properties: contact_properties(&s.record),
        })
        .collect(),
    };
    self.post_discard("/contacts/batch/update", &body).await
  }
}
