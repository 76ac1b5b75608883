//! Reference-data cache layer
//!
//! Read-through cache for CRM lookup data (users, campaigns, sources,
//! describe metadata, individual records). Keys are deterministic and part
//! of the adapter's external contract: other processes read this cache
//! directly, so the patterns in [`keys`] must stay stable.

use std::sync::RwLock;
use std::time::Duration;

use lendarc_common::cache::JsonCache;
use lendarc_common::time::{Clock, SystemClock};
use serde_json::Value;
use tracing::debug;

/// Stable cache key patterns.
pub mod keys {
    pub const SOURCES: &str = "sf.sources";
    pub const USERS: &str = "sf.users";
    pub const BDOS: &str = "sf.bdos";
    pub const CAMPAIGNS: &str = "sf.campaigns";

    /// Field metadata from a describe call.
    pub fn fields(resource: &str) -> String {
        format!("sf_fields_{resource}")
    }

    /// Picklist values extracted from a describe call.
    pub fn picklist(resource: &str) -> String {
        format!("sf_picklist_{resource}")
    }

    pub fn account(id_prefix: &str) -> String {
        format!("sf.account.{id_prefix}")
    }

    pub fn account_owner(id: &str) -> String {
        format!("sf.account.{id}.owner")
    }

    pub fn contact(id: &str) -> String {
        format!("sf.contact.{id}")
    }

    pub fn lead(id: &str) -> String {
        format!("sf.lead.{id}")
    }
}

/// JSON cache wrapper applying the adapter's TTL policy.
///
/// The TTL default comes from configuration (1440 seconds unless
/// overridden) and can be changed at runtime via [`ReferenceStore::set_ttl`].
pub struct ReferenceStore<C: Clock = SystemClock> {
    cache: JsonCache<C>,
    ttl: RwLock<Duration>,
}

impl ReferenceStore<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_cache(JsonCache::new(), ttl)
    }
}

impl<C: Clock> ReferenceStore<C> {
    pub fn with_cache(cache: JsonCache<C>, ttl: Duration) -> Self {
        Self { cache, ttl: RwLock::new(ttl) }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let value = self.cache.get(key);
        if value.is_some() {
            debug!(key, "reference cache hit");
        }
        value
    }

    /// Store under the current adapter TTL.
    pub fn put(&self, key: &str, value: &Value) {
        let ttl = *self.ttl.read().unwrap();
        self.cache.put(key, value, ttl);
    }

    pub fn has(&self, key: &str) -> bool {
        self.cache.has(key)
    }

    /// Override the adapter-level TTL for subsequent writes.
    pub fn set_ttl(&self, ttl: Duration) {
        *self.ttl.write().unwrap() = ttl;
    }

    pub fn ttl(&self) -> Duration {
        *self.ttl.read().unwrap()
    }

    /// Clears ALL cached entries process-wide, not just this adapter's
    /// namespace. Callers sharing the underlying store must expect that.
    pub fn flush_all(&self) {
        self.cache.flush_all();
    }
}
