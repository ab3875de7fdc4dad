use crate::cache::query_key::QueryKey;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};
use tracing::{debug, trace, warn};

/// A response held by the cache.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    fetched_at: Instant,
    invalidated: bool,
}

/// Data read from the cache, with its freshness.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub data: T,
    pub stale: bool,
}

/// Last known response per query key.
///
/// Entries are stale once older than the stale time or after an invalidation. Stale data is
/// still returned so a caller can show it while it refetches.
#[derive(Debug)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    stale_time: Duration,
}

impl QueryCache {
    /// Create an empty cache.
    pub fn new(stale_time: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stale_time,
        }
    }

    /// The entry table. A lock poisoned by a panicking reader still holds usable entries.
    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        match self.entries.lock() {
            Ok(entries) => entries,
            Err(error) => {
                warn!("recovering poisoned query cache");
                error.into_inner()
            }
        }
    }

    /// Read the entry for `key`. Entries that no longer decode as `T` are treated as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<Cached<T>> {
        let entries = self.entries();
        let entry = entries.get(key)?;
        let stale = entry.invalidated || entry.fetched_at.elapsed() >= self.stale_time;
        match serde_json::from_value(entry.value.clone()) {
            Ok(data) => Some(Cached { data, stale }),
            Err(error) => {
                debug!(%key, %error, "cached entry does not match the requested type");
                None
            }
        }
    }

    /// Store a fresh response for `key`.
    pub fn insert<T: Serialize>(&self, key: QueryKey, data: &T) {
        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(error) => {
                debug!(%key, %error, "response not cacheable");
                return;
            }
        };
        trace!(%key, "caching response");
        let mut entries = self.entries();
        entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
                invalidated: false,
            },
        );
    }

    /// Mark every key under `prefix` as stale. Returns how many entries were marked.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        debug!(%prefix, count, "invalidated cache entries");
        count
    }

    /// True when `key` has an entry that is not stale.
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        let entries = self.entries();
        entries
            .get(key)
            .map(|entry| !entry.invalidated && entry.fetched_at.elapsed() < self.stale_time)
            .unwrap_or(false)
    }
}
