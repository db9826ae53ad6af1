// =============================================================================
// MarketCache — 7-day memoisation of normalized markets per ZIP code
// =============================================================================
//
// Entries are stored as `{"timestamp": <epoch ms>, "data": <NormalizedMarket>}`
// under `rentcast_cache_<zip>`. An entry older than the TTL, or one that no
// longer parses, is deleted and treated as a miss. All store access is best
// effort: a broken store degrades to a network fetch, never to a failure.
// =============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::cache::store::KvStore;
use crate::error::{FetchError, StoreError};
use crate::market::{MarketSource, NormalizedMarket};

/// Key namespace shared with the browser-side cache format.
pub const CACHE_PREFIX: &str = "rentcast_cache_";

/// Entries are served for at most seven days.
pub const CACHE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// What is stored per ZIP. Timestamp and data are always written together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: i64,
    pub data: NormalizedMarket,
}

/// Result of looking a ZIP up in the store, without touching the network.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(NormalizedMarket),
    Miss,
    Expired { age_ms: i64 },
    Corrupt(String),
    Unavailable(StoreError),
}

/// Cache layer in front of an upstream [`MarketSource`].
#[derive(Clone)]
pub struct MarketCache {
    store: Arc<dyn KvStore>,
    upstream: Arc<dyn MarketSource>,
}

impl MarketCache {
    pub fn new(store: Arc<dyn KvStore>, upstream: Arc<dyn MarketSource>) -> Self {
        Self { store, upstream }
    }

    pub fn key_for(zip: &str) -> String {
        format!("{CACHE_PREFIX}{zip}")
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// Read the stored entry for `zip`. Expired and corrupt entries are
    /// removed on the way out.
    pub fn lookup(&self, zip: &str) -> CacheLookup {
        self.lookup_at(zip, Self::now_ms())
    }

    /// [`lookup`](Self::lookup) against an explicit clock. An entry exactly
    /// `CACHE_TTL_MS` old is still a hit.
    pub fn lookup_at(&self, zip: &str, now_ms: i64) -> CacheLookup {
        let key = Self::key_for(zip);

        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheLookup::Miss,
            Err(e) => return CacheLookup::Unavailable(e),
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                self.remove_best_effort(&key);
                return CacheLookup::Corrupt(e.to_string());
            }
        };

        let age_ms = now_ms - entry.timestamp;
        if age_ms > CACHE_TTL_MS {
            self.remove_best_effort(&key);
            return CacheLookup::Expired { age_ms };
        }

        CacheLookup::Hit(entry.data)
    }

    /// Write a fresh entry for `market` stamped with the current time.
    pub fn store_entry(&self, zip: &str, market: &NormalizedMarket) -> Result<(), StoreError> {
        let entry = CacheEntry {
            timestamp: Self::now_ms(),
            data: market.clone(),
        };
        let value = serde_json::to_string(&entry)?;
        self.store.set(&Self::key_for(zip), &value)
    }

    /// Drop the entry for `zip` so the next request goes upstream.
    pub fn invalidate(&self, zip: &str) -> Result<(), StoreError> {
        self.store.delete(&Self::key_for(zip))
    }

    fn remove_best_effort(&self, key: &str) {
        if let Err(e) = self.store.delete(key) {
            warn!(key, error = %e, "failed to remove stale cache entry");
        }
    }
}

#[async_trait]
impl MarketSource for MarketCache {
    #[instrument(skip(self), name = "cache::fetch_market")]
    async fn fetch_market(&self, zip: &str) -> Result<NormalizedMarket, FetchError> {
        match self.lookup(zip) {
            CacheLookup::Hit(market) => {
                debug!(zip, "using cached data");
                return Ok(market);
            }
            CacheLookup::Miss => debug!(zip, "cache miss"),
            CacheLookup::Expired { age_ms } => debug!(zip, age_ms, "cache entry expired"),
            CacheLookup::Corrupt(reason) => warn!(zip, reason = %reason, "discarded corrupt cache entry"),
            CacheLookup::Unavailable(e) => warn!(zip, error = %e, "cache read failed, going upstream"),
        }

        let market = self.upstream.fetch_market(zip).await?;

        if let Err(e) = self.store_entry(zip, &market) {
            warn!(zip, error = %e, "failed to write cache entry");
        }

        Ok(market)
    }
}

impl std::fmt::Debug for MarketCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketCache")
            .field("ttl_ms", &CACHE_TTL_MS)
            .finish()
    }
}
