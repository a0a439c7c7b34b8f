//! [`SqliteStore`] — the SQLite implementation of [`DestinationStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use leadsync_core::{
  model::{Company, Contact, NewContact, RecordId, Stored},
  store::DestinationStore,
};

use crate::{
  Error, Result,
  encode::{
    COMPANY_COLUMNS, CONTACT_COLUMNS, RawCompany, RawContact, company_name_key,
    contact_name_key, decode_dt, encode_dt, encode_enum, new_id,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A leadsync destination backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing and dry runs.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// When any company or contact was last written, if ever.
  pub async fn last_updated(&self) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT MAX(updated_at) FROM (
             SELECT updated_at FROM companies
             UNION ALL
             SELECT updated_at FROM contacts
           )",
          [],
          |row| row.get(0),
        )?)
      })
      .await?;

    raw.as_deref().map(decode_dt).transpose()
  }
}

// ─── DestinationStore impl ───────────────────────────────────────────────────

impl DestinationStore for SqliteStore {
  type Error = Error;

  // ── Snapshot ──────────────────────────────────────────────────────────────

  async fn list_companies(&self) -> Result<Vec<Stored<Company>>> {
    let raws: Vec<RawCompany> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMPANY_COLUMNS} FROM companies ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map([], RawCompany::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompany::into_stored).collect()
  }

  async fn list_contacts(&self) -> Result<Vec<Stored<Contact>>> {
    let raws: Vec<RawContact> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLUMNS}
           FROM contacts p
           JOIN companies c ON c.company_id = p.company_id
           ORDER BY p.created_at, p.rowid"
        ))?;
        let rows = stmt
          .query_map([], RawContact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_stored).collect()
  }

  // ── Bulk writes ───────────────────────────────────────────────────────────

  async fn create_companies(&self, records: &[Company]) -> Result<Vec<RecordId>> {
    let now = encode_dt(Utc::now());
    let rows: Vec<(String, String, Company)> = records
      .iter()
      .map(|c| (new_id(), company_name_key(&c.name), c.clone()))
      .collect();

    let ids = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
          let mut stmt = tx.prepare(
            "INSERT INTO companies (
               company_id, name, name_key, domain, classification_tag,
               priority_tier, signal_strength, status, source,
               created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
          )?;
          for (id, key, c) in rows {
            stmt.execute(rusqlite::params![
              id,
              c.name,
              key,
              c.domain,
              c.classification_tag,
              c.priority_tier.map(encode_enum),
              c.signal_strength.map(encode_enum),
              c.status,
              c.source,
              now,
            ])?;
            ids.push(id);
          }
        }
        tx.commit()?;
        Ok(ids)
      })
      .await?;

    tracing::debug!(count = ids.len(), "inserted companies");
    Ok(ids.into_iter().map(RecordId::new).collect())
  }

  async fn update_companies(&self, records: &[Stored<Company>]) -> Result<()> {
    let now = encode_dt(Utc::now());
    let rows: Vec<Stored<Company>> = records.to_vec();

    let missing: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "UPDATE companies SET
               domain = ?2, classification_tag = ?3, priority_tier = ?4,
               signal_strength = ?5, status = ?6, source = ?7, updated_at = ?8
             WHERE company_id = ?1",
          )?;
          for Stored { id, record: c } in rows {
            let changed = stmt.execute(rusqlite::params![
              id.as_str(),
              c.domain,
              c.classification_tag,
              c.priority_tier.map(encode_enum),
              c.signal_strength.map(encode_enum),
              c.status,
              c.source,
              now,
            ])?;
            if changed == 0 {
              // Dropping the transaction rolls the whole chunk back.
              return Ok(Some(id.0));
            }
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match missing {
      Some(id) => Err(Error::MissingRow { table: "companies", id }),
      None => Ok(()),
    }
  }

  async fn create_contacts(&self, records: &[NewContact]) -> Result<Vec<RecordId>> {
    let now = encode_dt(Utc::now());
    let rows: Vec<(String, String, NewContact)> = records
      .iter()
      .map(|r| (new_id(), contact_name_key(&r.contact), r.clone()))
      .collect();

    let ids = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
          let mut stmt = tx.prepare(
            "INSERT INTO contacts (
               contact_id, company_id, name, name_key, title,
               job_function, job_level, role_type, persona_score,
               linkedin_url, email, location, source,
               created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
          )?;
          for (id, key, NewContact { company_id, contact: p }) in rows {
            stmt.execute(rusqlite::params![
              id,
              company_id.as_str(),
              p.name,
              key,
              p.title,
              encode_enum(p.job_function),
              encode_enum(p.job_level),
              encode_enum(p.role_type),
              p.persona_score,
              p.linkedin_url,
              p.email,
              p.location,
              p.source,
              now,
            ])?;
            ids.push(id);
          }
        }
        tx.commit()?;
        Ok(ids)
      })
      .await?;

    tracing::debug!(count = ids.len(), "inserted contacts");
    Ok(ids.into_iter().map(RecordId::new).collect())
  }

  async fn update_contacts(&self, records: &[Stored<Contact>]) -> Result<()> {
    let now = encode_dt(Utc::now());
    let rows: Vec<Stored<Contact>> = records.to_vec();

    let missing: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "UPDATE contacts SET
               title = ?2, job_function = ?3, job_level = ?4, role_type = ?5,
               persona_score = ?6, linkedin_url = ?7, email = ?8,
               location = ?9, source = ?10, updated_at = ?11
             WHERE contact_id = ?1",
          )?;
          for Stored { id, record: p } in rows {
            let changed = stmt.execute(rusqlite::params![
              id.as_str(),
              p.title,
              encode_enum(p.job_function),
              encode_enum(p.job_level),
              encode_enum(p.role_type),
              p.persona_score,
              p.linkedin_url,
              p.email,
              p.location,
              p.source,
              now,
            ])?;
            if changed == 0 {
              return Ok(Some(id.0));
            }
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match missing {
      Some(id) => Err(Error::MissingRow { table: "contacts", id }),
      None => Ok(()),
    }
  }
}
