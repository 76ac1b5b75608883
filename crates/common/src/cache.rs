//! Process-wide JSON cache with per-entry TTL
//!
//! Backs the CRM adapter's read-through layer for reference/lookup data.
//! Values are serialized to textual JSON on write and parsed back on read,
//! so a stored value always round-trips to an equivalent JSON value
//! regardless of the caller's original typing.
//!
//! Each `put`/`get` is independently atomic under an `RwLock`; there are no
//! cross-key transactions. `flush_all` clears every entry in the store, not
//! just one namespace — callers sharing the cache must account for that.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::time::{Clock, SystemClock};

/// Entry stored in the cache: serialized JSON text plus its expiry deadline.
#[derive(Debug, Clone)]
struct CacheEntry {
    serialized: String,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Thread-safe string-keyed cache of JSON payloads.
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use lendarc_common::JsonCache;
/// use serde_json::json;
///
/// let cache = JsonCache::new();
/// cache.put("resource.user.1", &json!({"name": "Ada"}), Duration::from_secs(60));
/// assert_eq!(cache.get("resource.user.1"), Some(json!({"name": "Ada"})));
/// ```
pub struct JsonCache<C = SystemClock>
where
    C: Clock,
{
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    clock: C,
}

impl JsonCache<SystemClock> {
    /// Create a cache using the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for JsonCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> JsonCache<C> {
    /// Create a cache with a custom clock (useful for testing TTL expiry).
    pub fn with_clock(clock: C) -> Self {
        Self { entries: Arc::new(RwLock::new(HashMap::new())), clock }
    }

    /// Store a value under `key` for `ttl`.
    ///
    /// The value is serialized to JSON text before storage. A zero TTL makes
    /// the entry expired on arrival; it will never be observable.
    pub fn put(&self, key: &str, value: &Value, ttl: Duration) {
        let serialized = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(err) => {
                warn!(key, error = %err, "failed to serialize cache value; dropping");
                return;
            }
        };

        let entry = CacheEntry { serialized, inserted_at: self.clock.now(), ttl };
        let mut entries = self.entries.write().unwrap();
        entries.insert(key.to_string(), entry);
    }

    /// Fetch and parse the value under `key`.
    ///
    /// Returns `None` if the key is absent or the entry has expired. Expired
    /// entries are removed on read.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();

        {
            let entries = self.entries.read().unwrap();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    return match serde_json::from_str(&entry.serialized) {
                        Ok(value) => Some(value),
                        Err(err) => {
                            warn!(key, error = %err, "failed to parse cached value");
                            None
                        }
                    };
                }
                Some(_) => {} // expired, fall through to removal
                None => return None,
            }
        }

        let mut entries = self.entries.write().unwrap();
        // Re-check under the write lock; another thread may have replaced it.
        if let Some(entry) = entries.get(key) {
            if entry.is_expired(now) {
                entries.remove(key);
                debug!(key, "cache entry expired");
            }
        }
        None
    }

    /// Whether a live (non-expired) entry exists for `key`.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap();
        entries.get(key).map(|e| !e.is_expired(now)).unwrap_or(false)
    }

    /// Remove a single entry.
    pub fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap();
        entries.remove(key);
    }

    /// Clear ALL cached entries, across every namespace sharing this store.
    pub fn flush_all(&self) {
        let mut entries = self.entries.write().unwrap();
        let count = entries.len();
        entries.clear();
        debug!(count, "cache flushed");
    }

    /// Number of entries currently held, including not-yet-evicted expired
    /// ones.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Clock + Clone> Clone for JsonCache<C> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries), clock: self.clock.clone() }
    }
}
