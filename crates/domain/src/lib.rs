//! Domain types shared across LendArc crates.
//!
//! This crate holds the error enum, the CRM record-reference types, and the
//! loan-origination entities that the CRM adapter serializes. It has no I/O
//! and no async surface.

pub mod errors;
pub mod types;

pub use errors::{LendArcError, Result};
pub use types::crm::{CrmId, TriState};
pub use types::loan::{Company, LoanApplication, Owner, ReferenceRecord};
