//! Adapter configuration
//!
//! All construction-time options live in an explicit [`CrmConfig`] passed to
//! the client; the adapter reads no ambient environment state.

use std::time::Duration;

use lendarc_domain::{LendArcError, Result};
use serde::{Deserialize, Serialize};

/// Which CRM org the adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Sandbox,
}

/// CRM adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// Production login/base URL.
    pub base_url: String,
    /// Sandbox login/base URL, used when `environment` is `Sandbox`.
    pub sandbox_url: String,
    pub environment: Environment,

    /// OAuth connected-app credentials (password grant).
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,

    /// REST data endpoint prefix, e.g. `/services/data/v58.0`.
    pub api_version_path: String,
    /// OAuth token endpoint path on the login URL.
    pub token_path: String,
    /// Prefix for custom Apex-style action invocations.
    pub custom_endpoint_path: String,

    /// Nominal session lifetime. Also bounds the per-request timeout.
    pub token_ttl_minutes: u64,
    /// Default TTL for cached reference data.
    pub cache_ttl_seconds: u64,
    /// Hour fixup applied to datetimes before ISO-8601 rendering.
    ///
    /// Compensates for a known timezone subtraction on the CRM side; the
    /// correct value depends on the org's timezone configuration.
    pub datetime_hour_offset: i64,

    pub ssl_verify: bool,
    /// When set, request and response bodies are logged at debug severity.
    pub verbose_debug: bool,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://login.salesforce.com".to_string(),
            sandbox_url: "https://test.salesforce.com".to_string(),
            environment: Environment::Production,
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            password: String::new(),
            api_version_path: "/services/data/v58.0".to_string(),
            token_path: "/services/oauth2/token".to_string(),
            custom_endpoint_path: "/services/apexrest".to_string(),
            token_ttl_minutes: 60,
            cache_ttl_seconds: 1440,
            datetime_hour_offset: 7,
            ssl_verify: true,
            verbose_debug: false,
        }
    }
}

impl CrmConfig {
    /// Login URL for the configured environment.
    pub fn login_url(&self) -> &str {
        match self.environment {
            Environment::Production => &self.base_url,
            Environment::Sandbox => &self.sandbox_url,
        }
    }

    /// Full OAuth token endpoint.
    pub fn token_endpoint(&self) -> String {
        format!("{}{}", self.login_url(), self.token_path)
    }

    /// Nominal session lifetime as a duration.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_minutes * 60)
    }

    /// Default reference-data cache TTL as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Reject configurations that cannot possibly authenticate. Checked at
    /// client construction, before any network traffic.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(LendArcError::Config("missing OAuth client credentials".to_string()));
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err(LendArcError::Config("missing CRM user credentials".to_string()));
        }
        Ok(())
    }
}
