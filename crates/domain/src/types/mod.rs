//! Shared domain type definitions.

pub mod crm;
pub mod loan;
