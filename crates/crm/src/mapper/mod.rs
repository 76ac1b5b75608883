//! Record mapping
//!
//! Pure translation of domain entities into the CRM's flat field-name/value
//! maps. No state and no I/O: a [`FieldMap`] is built fresh per call and
//! handed to the client. The field names themselves encode one org's custom
//! schema; the helpers (tri-state picklists, datetime fixup) are the
//! reusable part.

mod company;
mod loan;
mod owner;

pub use company::company_fields;
pub use loan::loan_fields;
pub use owner::owner_fields;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use lendarc_domain::TriState;
use serde_json::{Map, Value};

/// Flat CRM field-name → scalar value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(Map<String, Value>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field unconditionally.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// Set a field only when a value is present; absent fields are omitted
    /// from the payload entirely (the CRM distinguishes absent from null).
    pub fn set_opt(&mut self, field: &str, value: Option<impl Into<Value>>) -> &mut Self {
        if let Some(value) = value {
            self.0.insert(field.to_string(), value.into());
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<FieldMap> for Value {
    fn from(map: FieldMap) -> Self {
        map.into_value()
    }
}

/// Tri-state disclosure → picklist string.
///
/// `Yes`/`No`/`Prefer Not to Disclose`; undisclosed input maps to the
/// disclosure picklist value, absent input to no field at all.
pub fn tri_state_picklist(value: Option<TriState>) -> Option<&'static str> {
    match value? {
        TriState::Yes => Some("Yes"),
        TriState::No => Some("No"),
        TriState::Undisclosed => Some("Prefer Not to Disclose"),
    }
}

/// Inverted tri-state → picklist string, for questions the CRM asks in the
/// negative. Undisclosed carries no signal either way and is dropped.
pub fn inverted_tri_state_picklist(value: Option<TriState>) -> Option<&'static str> {
    match value? {
        TriState::Yes => Some("No"),
        TriState::No => Some("Yes"),
        TriState::Undisclosed => None,
    }
}

/// Render a date-only value as a calendar date.
pub fn crm_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Render a datetime for the CRM.
///
/// A fixed hour offset is added before ISO-8601 rendering, compensating for
/// a known timezone subtraction on the CRM side. The offset depends on the
/// org's timezone configuration and comes from `CrmConfig`.
pub fn crm_datetime(datetime: DateTime<Utc>, hour_offset: i64) -> String {
    let adjusted = datetime + TimeDelta::hours(hour_offset);
    adjusted.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
