//! CRM-facing value types.
//!
//! The CRM owns its record identifiers; the adapter only stores them back on
//! domain entities as foreign keys once a record has been created remotely.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque external record identifier assigned by the CRM.
///
/// Treated as foreign-key data: persisted on the corresponding domain entity
/// after the first successful create and never interpreted locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrmId(String);

impl CrmId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First three characters of the id, used by the CRM to namespace
    /// object types (e.g. accounts vs. leads). Ids are externally owned, so
    /// the cut respects character boundaries rather than assuming ASCII.
    pub fn prefix(&self) -> &str {
        match self.0.char_indices().nth(3) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for CrmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CrmId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Tri-state disclosure flag used on demographic questions.
///
/// Serialized as `0`/`1`/`2` in intake payloads; the mapper renders it as a
/// picklist string on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TriState {
    No,
    Yes,
    Undisclosed,
}

impl TriState {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::No),
            1 => Some(Self::Yes),
            2 => Some(Self::Undisclosed),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            Self::No => 0,
            Self::Yes => 1,
            Self::Undisclosed => 2,
        }
    }
}

impl TryFrom<u8> for TriState {
    type Error = String;

    fn try_from(raw: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or_else(|| format!("invalid tri-state value: {raw}"))
    }
}

impl From<TriState> for u8 {
    fn from(value: TriState) -> Self {
        value.as_raw()
    }
}
