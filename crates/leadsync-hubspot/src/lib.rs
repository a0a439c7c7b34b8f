//! HubSpot CRM destination for leadsync.
//!
//! Speaks the CRM v3 objects API over [`reqwest`]: paged `GET` for the
//! snapshot, `batch/create` and `batch/update` for writes. A batch call is
//! accepted or rejected as a whole, which is the chunk atomicity the
//! pipeline relies on. Contacts are created with a primary association to
//! their owning company.

mod properties;
mod store;
mod wire;

pub mod error;

pub use error::{Error, Result};
pub use store::{DEFAULT_BASE_URL, HubSpotConfig, HubSpotStore};
