//! Request and response bodies of the CRM v3 objects API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::properties::Properties;

/// Association type id for "contact to company (primary)".
pub const CONTACT_TO_COMPANY: u32 = 279;

#[derive(Debug, Deserialize)]
pub struct Page {
  #[serde(default)]
  pub results: Vec<Object>,
  pub paging:  Option<Paging>,
}

impl Page {
  /// Cursor for the next page, if there is one.
  pub fn next_after(&self) -> Option<&str> {
    self
      .paging
      .as_ref()
      .and_then(|p| p.next.as_ref())
      .map(|n| n.after.as_str())
  }
}

#[derive(Debug, Deserialize)]
pub struct Paging {
  pub next: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
pub struct NextPage {
  pub after: String,
}

/// One CRM object; unset properties come back as `null`.
#[derive(Debug, Deserialize)]
pub struct Object {
  pub id:         String,
  #[serde(default)]
  pub properties: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct BatchResult {
  #[serde(default)]
  pub results: Vec<Object>,
}

#[derive(Debug, Serialize)]
pub struct BatchCreate {
  pub inputs: Vec<CreateInput>,
}

#[derive(Debug, Serialize)]
pub struct CreateInput {
  pub properties:   Properties,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub associations: Vec<Association>,
}

#[derive(Debug, Serialize)]
pub struct Association {
  pub to:    AssociationTarget,
  pub types: Vec<AssociationType>,
}

impl Association {
  pub fn primary_company(company_id: &str) -> Self {
    Self {
      to:    AssociationTarget { id: company_id.to_owned() },
      types: vec![AssociationType {
        association_category: "HUBSPOT_DEFINED",
        association_type_id:  CONTACT_TO_COMPANY,
      }],
    }
  }
}

#[derive(Debug, Serialize)]
pub struct AssociationTarget {
  pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationType {
  pub association_category: &'static str,
  pub association_type_id:  u32,
}

#[derive(Debug, Serialize)]
pub struct BatchUpdate {
  pub inputs: Vec<UpdateInput>,
}

#[derive(Debug, Serialize)]
pub struct UpdateInput {
  pub id:         String,
  pub properties: Properties,
}
