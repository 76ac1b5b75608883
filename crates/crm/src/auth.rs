//! OAuth token lifecycle
//!
//! Owns the password-grant authentication flow and the current session. A
//! failed token fetch leaves the manager in a degraded token-absent state
//! instead of aborting: data operations short-circuit to empty results until
//! a session exists.
//!
//! There is no refresh-on-expiry. The nominal TTL is recorded on the session
//! so callers can observe staleness, but requests issued after it are sent
//! with the old token; recovery is an explicit [`TokenManager::reset`]
//! followed by re-acquisition.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use lendarc_common::time::{Clock, SystemClock};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::config::CrmConfig;
use crate::errors::CrmError;
use crate::http::HttpClient;

/// An authenticated CRM session.
///
/// `base_url` is the instance URL returned by the auth server, which
/// replaces the configured login URL (auth may redirect pods).
#[derive(Debug, Clone)]
pub struct Session {
    pub base_url: String,
    pub access_token: String,
    pub acquired_at: Instant,
    pub ttl: Duration,
}

impl Session {
    /// Whether the nominal TTL has elapsed. Informational only: the manager
    /// never refreshes on expiry.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.acquired_at) >= self.ttl
    }
}

/// Source of the current session for the request envelope.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current session, if one has been established.
    async fn session(&self) -> Option<Session>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: Option<String>,
}

/// Manages password-grant authentication and the current session.
pub struct TokenManager<C: Clock = SystemClock> {
    config: CrmConfig,
    http: HttpClient,
    session: RwLock<Option<Session>>,
    /// Single-flight guard: one token fetch at a time, concurrent callers
    /// await the in-flight fetch.
    fetch_lock: Mutex<()>,
    clock: C,
}

impl TokenManager<SystemClock> {
    pub fn new(config: CrmConfig, http: HttpClient) -> Self {
        Self::with_clock(config, http, SystemClock)
    }
}

impl<C: Clock> TokenManager<C> {
    pub fn with_clock(config: CrmConfig, http: HttpClient, clock: C) -> Self {
        Self { config, http, session: RwLock::new(None), fetch_lock: Mutex::new(()), clock }
    }

    /// Return the current session, establishing one if absent.
    ///
    /// On fetch failure the manager logs and stays token-absent; the
    /// adapter keeps running degraded rather than aborting.
    pub async fn ensure_session(&self) -> Option<Session> {
        if let Some(session) = self.session.read().await.clone() {
            return Some(session);
        }

        let _guard = self.fetch_lock.lock().await;
        // Re-check: another caller may have completed the fetch while we
        // waited on the guard.
        if let Some(session) = self.session.read().await.clone() {
            return Some(session);
        }

        match self.fetch_token().await {
            Ok(session) => {
                info!(instance_url = %session.base_url, "CRM session established");
                *self.session.write().await = Some(session.clone());
                Some(session)
            }
            Err(err) => {
                error!(
                    endpoint = %self.config.token_endpoint(),
                    error = %err,
                    "token fetch failed; continuing without a session"
                );
                None
            }
        }
    }

    /// Current session without attempting acquisition.
    pub async fn current(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Whether a session exists (expired or not).
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Drop the current session. The next `ensure_session` re-authenticates.
    pub async fn reset(&self) {
        *self.session.write().await = None;
    }

    async fn fetch_token(&self) -> Result<Session, CrmError> {
        let endpoint = self.config.token_endpoint();
        let params = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let request = self.http.request(reqwest::Method::POST, &endpoint).form(&params);
        let response = self.http.send(request).await?;

        let status = response.status();
        if status.as_u16() >= 300 {
            return Err(CrmError::from_status(status).with_endpoint(endpoint));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| CrmError::from(err).with_endpoint(endpoint.clone()))?;

        // The instance URL returned by the auth server replaces the
        // configured login URL.
        let base_url =
            body.instance_url.unwrap_or_else(|| self.config.login_url().to_string());

        Ok(Session {
            base_url,
            access_token: body.access_token,
            acquired_at: self.clock.now(),
            ttl: self.config.token_ttl(),
        })
    }
}

#[async_trait]
impl<C: Clock> SessionProvider for TokenManager<C> {
    async fn session(&self) -> Option<Session> {
        self.current().await
    }
}
