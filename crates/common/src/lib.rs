//! Common utilities shared across LendArc crates.
//!
//! Provides the time abstraction used for deterministic TTL testing and the
//! process-wide JSON cache backing the CRM adapter's read-through layer.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod cache;
pub mod time;

pub use cache::JsonCache;
pub use time::{Clock, MockClock, SystemClock};
