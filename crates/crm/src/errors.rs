//! CRM error classification
//!
//! Classifies HTTP statuses and transport failures into the adapter's
//! failure taxonomy. None of these cross the public boundary as faults:
//! every category converges to an empty result at the call site, with a log
//! entry for everything except the expected not-found case.

use std::fmt;

use lendarc_domain::LendArcError;
use reqwest::StatusCode;

/// Failure category for a CRM round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrmErrorCategory {
    /// Token fetch rejected or no session could be established.
    AuthFailure,

    /// 404 from the CRM; an expected case for missing records.
    NotFound,

    /// Any other status >= 300.
    RemoteRejected,

    /// Network-level failure (timeout, connection refused, DNS).
    TransportFailure,

    /// Response body was not valid JSON.
    DecodeFailure,
}

impl CrmErrorCategory {
    /// Whether this failure is logged. Not-found is the one silent case:
    /// callers look up records that legitimately do not exist yet.
    pub fn is_logged(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

impl fmt::Display for CrmErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthFailure => write!(f, "authentication failure"),
            Self::NotFound => write!(f, "not found"),
            Self::RemoteRejected => write!(f, "remote rejected"),
            Self::TransportFailure => write!(f, "transport failure"),
            Self::DecodeFailure => write!(f, "decode failure"),
        }
    }
}

/// Classified CRM failure with the endpoint it occurred against.
#[derive(Debug, Clone)]
pub struct CrmError {
    category: CrmErrorCategory,
    message: String,
    endpoint: Option<String>,
}

impl CrmError {
    pub fn new(category: CrmErrorCategory, message: impl Into<String>) -> Self {
        Self { category, message: message.into(), endpoint: None }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn category(&self) -> CrmErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Classify an HTTP status. Only statuses >= 300 reach this point.
    pub fn from_status(status: StatusCode) -> Self {
        let category = match status.as_u16() {
            404 => CrmErrorCategory::NotFound,
            401 | 403 => CrmErrorCategory::AuthFailure,
            _ => CrmErrorCategory::RemoteRejected,
        };

        Self::new(
            category,
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ),
        )
    }

    pub fn decode(err: &serde_json::Error) -> Self {
        Self::new(CrmErrorCategory::DecodeFailure, err.to_string())
    }
}

impl fmt::Display for CrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)?;
        if let Some(endpoint) = &self.endpoint {
            write!(f, " ({endpoint})")?;
        }
        Ok(())
    }
}

impl std::error::Error for CrmError {}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status);
        }

        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "failed to connect to CRM".to_string()
        } else {
            err.to_string()
        };

        Self::new(CrmErrorCategory::TransportFailure, message)
    }
}

impl From<CrmError> for LendArcError {
    fn from(err: CrmError) -> Self {
        let message = err.to_string();
        match err.category {
            CrmErrorCategory::AuthFailure => LendArcError::Auth(message),
            CrmErrorCategory::NotFound => LendArcError::NotFound(message),
            CrmErrorCategory::DecodeFailure => LendArcError::Serialization(message),
            CrmErrorCategory::RemoteRejected | CrmErrorCategory::TransportFailure => {
                LendArcError::Network(message)
            }
        }
    }
}
