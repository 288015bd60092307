//! DashMap Country Cache
//!
//! Implements CountryCache using DashMap for concurrent access.

use crate::domain::entities::CacheEntry;
use crate::domain::ports::CountryCache;
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// DashMap-backed country cache.
///
/// Expired entries are evicted lazily when their key is read. Clones share
/// the same underlying map.
#[derive(Clone, Default)]
pub struct DashMapCountryCache {
    entries: Arc<DashMap<IpAddr, CacheEntry>>,
}

impl DashMapCountryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CountryCache for DashMapCountryCache {
    fn get(&self, ip: &IpAddr) -> Option<CacheEntry> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(ip) {
            if entry.is_live(now) {
                return Some(entry.value().clone());
            }
        } else {
            return None;
        }

        // Re-checked under the shard lock: a concurrent put may have refreshed it.
        if self
            .entries
            .remove_if(ip, |_, entry| !entry.is_live(now))
            .is_some()
        {
            tracing::debug!("evicted expired cache entry for {}", ip);
        }
        None
    }

    fn put(&self, ip: IpAddr, country_code: Option<String>, ttl: Duration) {
        self.entries.insert(ip, CacheEntry::new(country_code, ttl));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
