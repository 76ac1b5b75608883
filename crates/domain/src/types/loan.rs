//! Loan-origination entities the adapter serializes.
//!
//! These are the external collaborators' shapes: the business rules that
//! populate them live upstream, and the persistence of assigned CRM ids is
//! the caller's responsibility. Only the fields the CRM mappers consume are
//! modeled here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::crm::{CrmId, TriState};

/// A loan application moving through intake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: i64,
    pub amount_requested: f64,
    pub term_months: Option<u32>,
    pub use_of_funds: Option<String>,
    pub product: Option<String>,
    pub source: Option<String>,
    pub campaign: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub started_on: Option<NaiveDate>,
    pub company: Company,
    pub owners: Vec<Owner>,
    /// CRM opportunity id, assigned after the first successful create.
    pub crm_id: Option<CrmId>,
}

/// The borrowing business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub legal_name: String,
    pub dba: Option<String>,
    pub ein: Option<String>,
    pub entity_type: Option<String>,
    pub naics_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub annual_revenue: Option<f64>,
    pub founded_on: Option<NaiveDate>,
    /// CRM account id, assigned after the first successful create.
    pub crm_id: Option<CrmId>,
}

/// A beneficial owner on the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub ownership_percent: Option<f64>,
    pub date_of_birth: Option<NaiveDate>,
    pub is_primary: bool,
    /// Demographic disclosures; rendered as picklists on the wire.
    pub veteran: Option<TriState>,
    pub woman_owned: Option<TriState>,
    pub minority_owned: Option<TriState>,
    /// Asked in the negative on the CRM side, so the mapper inverts it.
    pub us_citizen: Option<TriState>,
    /// CRM contact id, assigned after the first successful create.
    pub crm_id: Option<CrmId>,
}

/// A reference/lookup row fetched from the CRM (users, campaigns, sources,
/// business development officers). Schema is CRM-configuration-dependent, so
/// only the common identity fields are typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    #[serde(rename = "Id")]
    pub id: CrmId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
