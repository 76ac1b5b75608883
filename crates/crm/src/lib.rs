//! CRM integration adapter
//!
//! Outbound adapter translating loan-origination entities into a
//! Salesforce-style REST CRM: password-grant authentication, generic sobject
//! CRUD, SOQL queries with pagination, cached reference lookups, and entity
//! sync that writes assigned CRM ids back onto the domain entities.
//!
//! The adapter is best-effort by contract: remote failures converge to empty
//! results plus log entries, never to surfaced errors, and nothing is
//! retried. See [`envelope`] for the classification policy.

#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod http;
pub mod mapper;
pub mod query;
pub mod reference;

pub use auth::{Session, SessionProvider, TokenManager};
pub use client::CrmClient;
pub use config::{CrmConfig, Environment};
pub use envelope::{ApiOutcome, Envelope};
pub use errors::{CrmError, CrmErrorCategory};
pub use mapper::{company_fields, loan_fields, owner_fields, FieldMap};
pub use query::{encode_soql, QueryPage, QueryRunner};
pub use reference::{keys, ReferenceStore};
