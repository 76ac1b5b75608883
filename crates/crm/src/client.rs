//! CRM client
//!
//! Public adapter surface. Construction resolves the environment and eagerly
//! fetches a token; every operation then goes through the request envelope,
//! optionally via the reference cache or the query runner.
//!
//! Failure policy (uniform across all methods): failures converge to an
//! empty result (`None`, empty `Vec`, `false`) plus a log entry from the
//! envelope. Callers treat emptiness as the failure signal and must not
//! expect faults.

use std::sync::Arc;
use std::time::Duration;

use lendarc_common::time::{Clock, SystemClock};
use lendarc_domain::{Company, CrmId, LendArcError, LoanApplication, Owner, ReferenceRecord, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::{SessionProvider, TokenManager};
use crate::config::CrmConfig;
use crate::envelope::Envelope;
use crate::http::{HttpClient, VerbatimClient};
use crate::mapper::{company_fields, loan_fields, owner_fields, FieldMap};
use crate::query::QueryRunner;
use crate::reference::{keys, ReferenceStore};

/// Authenticated CRM adapter bound to one org.
pub struct CrmClient<C: Clock = SystemClock> {
    config: CrmConfig,
    tokens: Arc<TokenManager<C>>,
    envelope: Envelope,
    query: QueryRunner,
    cache: ReferenceStore,
}

impl CrmClient<SystemClock> {
    /// Build the adapter and eagerly authenticate.
    ///
    /// A failed token fetch does not fail construction: the client comes up
    /// in a degraded token-absent state and every operation short-circuits
    /// to empty until a session exists.
    pub async fn connect(config: CrmConfig) -> Result<Self> {
        Self::connect_with_clock(config, SystemClock).await
    }
}

impl<C: Clock> CrmClient<C> {
    /// Build the adapter with a custom clock (for session-age tests).
    pub async fn connect_with_clock(config: CrmConfig, clock: C) -> Result<Self> {
        config.validate()?;

        let http = HttpClient::builder()
            // The per-request timeout is bound to the token TTL.
            .timeout(config.token_ttl())
            .ssl_verify(config.ssl_verify)
            .build()
            .map_err(LendArcError::from)?;
        let verbatim = VerbatimClient::new(config.token_ttl(), config.ssl_verify)
            .map_err(LendArcError::from)?;

        let tokens = Arc::new(TokenManager::with_clock(config.clone(), http.clone(), clock));
        tokens.ensure_session().await;

        let sessions: Arc<dyn SessionProvider> = Arc::clone(&tokens) as _;
        let envelope = Envelope::new(http, verbatim, sessions, config.verbose_debug);
        let query = QueryRunner::new(envelope.clone(), config.api_version_path.clone());
        let cache = ReferenceStore::new(config.cache_ttl());

        Ok(Self { config, tokens, envelope, query, cache })
    }

    /// Whether a session currently exists.
    pub async fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated().await
    }

    /// Drop the session; the next operation re-authenticates eagerly via
    /// [`CrmClient::reconnect`].
    pub async fn reset_session(&self) {
        self.tokens.reset().await;
    }

    /// Re-acquire a session after a reset (or a failed initial fetch).
    pub async fn reconnect(&self) -> bool {
        self.tokens.ensure_session().await.is_some()
    }

    /// Override the reference-cache TTL for subsequent writes.
    pub fn set_cache_ttl(&self, seconds: u64) {
        self.cache.set_ttl(Duration::from_secs(seconds));
    }

    /// Clear ALL cached reference data (process-wide side effect).
    pub fn flush_cache(&self) {
        self.cache.flush_all();
    }

    // -------------------------------------------------------------------
    // sobject operations
    // -------------------------------------------------------------------

    fn sobject_path(&self, sobject: &str, id: Option<&CrmId>) -> String {
        match id {
            Some(id) => format!("{}/sobjects/{}/{}", self.config.api_version_path, sobject, id),
            None => format!("{}/sobjects/{}", self.config.api_version_path, sobject),
        }
    }

    /// Create a record; returns the CRM-assigned id.
    pub async fn create(&self, sobject: &str, fields: FieldMap) -> Option<CrmId> {
        let path = self.sobject_path(sobject, None);
        let outcome = self.envelope.request(Method::POST, &path, Some(&fields.into_value())).await;
        let id = outcome.into_value()?.get("id").and_then(Value::as_str).map(CrmId::new)?;
        info!(sobject, %id, "created CRM record");
        Some(id)
    }

    /// Update an existing record. The CRM answers 204 on success.
    pub async fn update(&self, sobject: &str, id: &CrmId, fields: FieldMap) -> bool {
        let path = self.sobject_path(sobject, Some(id));
        let outcome = self.envelope.request(Method::PATCH, &path, Some(&fields.into_value())).await;
        outcome.succeeded()
    }

    /// Create-if-absent, update-if-present, keyed by a previously stored id.
    pub async fn upsert(
        &self,
        sobject: &str,
        existing: Option<&CrmId>,
        fields: FieldMap,
    ) -> Option<CrmId> {
        match existing {
            Some(id) => self.update(sobject, id, fields).await.then(|| id.clone()),
            None => self.create(sobject, fields).await,
        }
    }

    /// Fetch a record by id.
    pub async fn retrieve(&self, sobject: &str, id: &CrmId) -> Option<Value> {
        let path = self.sobject_path(sobject, Some(id));
        self.envelope.request(Method::GET, &path, None).await.into_value()
    }

    /// Describe metadata for an sobject, cached under `sf_fields_<resource>`.
    pub async fn describe(&self, sobject: &str) -> Option<Value> {
        let key = keys::fields(&sobject.to_lowercase());
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }

        let path = format!("{}/sobjects/{}/describe", self.config.api_version_path, sobject);
        let value = self.envelope.request(Method::GET, &path, None).await.into_value()?;
        self.cache.put(&key, &value);
        Some(value)
    }

    /// Picklist values for one field, from cached describe metadata.
    pub async fn picklist_values(&self, sobject: &str, field: &str) -> Vec<String> {
        let key = keys::picklist(&sobject.to_lowercase());

        let picklists = match self.cache.get(&key) {
            Some(cached) => cached,
            None => {
                let Some(describe) = self.describe(sobject).await else {
                    return Vec::new();
                };
                let picklists = extract_picklists(&describe);
                self.cache.put(&key, &picklists);
                picklists
            }
        };

        picklists
            .get(field)
            .and_then(Value::as_array)
            .map(|values| {
                values.iter().filter_map(Value::as_str).map(str::to_string).collect()
            })
            .unwrap_or_default()
    }

    /// Invoke a custom Apex-style action.
    pub async fn invoke_action(&self, action: &str, payload: &Value) -> Option<Value> {
        let path = format!("{}/{}", self.config.custom_endpoint_path, action);
        self.envelope.request(Method::POST, &path, Some(payload)).await.into_value()
    }

    // -------------------------------------------------------------------
    // queries
    // -------------------------------------------------------------------

    /// Run a query and follow pagination cursors until exhausted.
    ///
    /// The runner fetches one page per call; the looping lives here, with
    /// the caller, accumulating records in order.
    pub async fn query_all(&self, soql: &str) -> Vec<Value> {
        let mut records = Vec::new();
        let Some(mut page) = self.query.run(soql).await else {
            return records;
        };

        loop {
            records.append(&mut page.records);
            let Some(cursor) = page.next_records_url.take() else {
                break;
            };
            match self.query.follow(&cursor).await {
                Some(next) => page = next,
                None => break,
            }
        }

        debug!(count = records.len(), "query complete");
        records
    }

    // -------------------------------------------------------------------
    // reference data (read-through cached)
    // -------------------------------------------------------------------

    async fn cached_reference_query(&self, key: &str, soql: &str) -> Vec<ReferenceRecord> {
        if let Some(cached) = self.cache.get(key) {
            if let Ok(records) = serde_json::from_value(cached) {
                return records;
            }
        }

        let records: Vec<ReferenceRecord> = self
            .query_all(soql)
            .await
            .into_iter()
            .filter_map(|record| serde_json::from_value(record).ok())
            .collect();

        if !records.is_empty() {
            if let Ok(value) = serde_json::to_value(&records) {
                self.cache.put(key, &value);
            }
        }
        records
    }

    /// Lead sources configured in the org.
    pub async fn sources(&self) -> Vec<ReferenceRecord> {
        self.cached_reference_query(
            keys::SOURCES,
            "SELECT Id, Name FROM Lead_Source__c ORDER BY Name",
        )
        .await
    }

    /// Active CRM users.
    pub async fn users(&self) -> Vec<ReferenceRecord> {
        self.cached_reference_query(
            keys::USERS,
            "SELECT Id, Name FROM User WHERE IsActive = true ORDER BY Name",
        )
        .await
    }

    /// Business development officers.
    pub async fn bdos(&self) -> Vec<ReferenceRecord> {
        self.cached_reference_query(
            keys::BDOS,
            "SELECT Id, Name FROM User WHERE IsActive = true AND Is_BDO__c = true ORDER BY Name",
        )
        .await
    }

    /// Active campaigns.
    pub async fn campaigns(&self) -> Vec<ReferenceRecord> {
        self.cached_reference_query(
            keys::CAMPAIGNS,
            "SELECT Id, Name FROM Campaign WHERE IsActive = true ORDER BY Name",
        )
        .await
    }

    /// Fetch an account by id, read-through cached.
    ///
    /// Accounts are keyed by the id prefix, not the full id; processes
    /// sharing the cache rely on that key shape.
    pub async fn account(&self, id: &CrmId) -> Option<Value> {
        let key = keys::account(id.prefix());
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }
        let value = self.retrieve("Account", id).await?;
        self.cache.put(&key, &value);
        Some(value)
    }

    /// Owning user of an account, read-through cached.
    pub async fn account_owner(&self, id: &CrmId) -> Option<Value> {
        let key = keys::account_owner(id.as_str());
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }

        let soql =
            format!("SELECT OwnerId, Owner.Name FROM Account WHERE Id = '{}'", id.as_str());
        let record = self.query_all(&soql).await.into_iter().next()?;
        self.cache.put(&key, &record);
        Some(record)
    }

    /// Fetch a contact by id, read-through cached.
    pub async fn contact(&self, id: &CrmId) -> Option<Value> {
        let key = keys::contact(id.as_str());
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }
        let value = self.retrieve("Contact", id).await?;
        self.cache.put(&key, &value);
        Some(value)
    }

    /// Fetch a lead by id, read-through cached.
    pub async fn lead(&self, id: &CrmId) -> Option<Value> {
        let key = keys::lead(id.as_str());
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }
        let value = self.retrieve("Lead", id).await?;
        self.cache.put(&key, &value);
        Some(value)
    }

    // -------------------------------------------------------------------
    // entity sync
    // -------------------------------------------------------------------

    /// Upsert the company as an Account. On first create the assigned CRM id
    /// is written back onto the entity; persisting it is the caller's job.
    pub async fn sync_company(&self, company: &mut Company) -> Option<CrmId> {
        let fields = company_fields(company);
        let id = self.upsert("Account", company.crm_id.as_ref(), fields).await?;
        company.crm_id = Some(id.clone());
        Some(id)
    }

    /// Upsert an owner as a Contact, linking it to the account when one
    /// exists.
    pub async fn sync_owner(&self, owner: &mut Owner, account_id: Option<&CrmId>) -> Option<CrmId> {
        let fields = owner_fields(owner, account_id);
        let id = self.upsert("Contact", owner.crm_id.as_ref(), fields).await?;
        owner.crm_id = Some(id.clone());
        Some(id)
    }

    /// Upsert a full application: account, then contacts, then the
    /// opportunity with its relation fields. Best-effort throughout; a
    /// failed step leaves the corresponding id unassigned and the sync
    /// continues with what it has.
    pub async fn sync_application(&self, app: &mut LoanApplication) -> Option<CrmId> {
        let _ = self.sync_company(&mut app.company).await;
        let account_id = app.company.crm_id.clone();

        for owner in &mut app.owners {
            let _ = self.sync_owner(owner, account_id.as_ref()).await;
        }
        let primary_contact_id =
            app.owners.iter().find(|o| o.is_primary).and_then(|o| o.crm_id.clone());

        let fields = loan_fields(
            app,
            self.config.datetime_hour_offset,
            account_id.as_ref(),
            primary_contact_id.as_ref(),
        );
        let id = self.upsert("Opportunity", app.crm_id.as_ref(), fields).await?;
        app.crm_id = Some(id.clone());
        Some(id)
    }
}

/// Build a field → picklist-values map from describe metadata.
fn extract_picklists(describe: &Value) -> Value {
    let mut out = serde_json::Map::new();

    if let Some(fields) = describe.get("fields").and_then(Value::as_array) {
        for field in fields {
            let Some(name) = field.get("name").and_then(Value::as_str) else {
                continue;
            };
            let values: Vec<Value> = field
                .get("picklistValues")
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|entry| {
                            entry.get("active").and_then(Value::as_bool).unwrap_or(true)
                        })
                        .filter_map(|entry| entry.get("value").cloned())
                        .collect()
                })
                .unwrap_or_default();

            if !values.is_empty() {
                out.insert(name.to_string(), Value::Array(values));
            }
        }
    }

    Value::Object(out)
}
