//! Country Cache Port
//!
//! Defines the interface for the time-bounded IP-to-country cache.

use crate::domain::entities::CacheEntry;
use std::net::IpAddr;
use std::time::Duration;

/// Time-bounded mapping from IP to a previously resolved country.
///
/// Owned by a resolver instance. Share it between resolvers only by passing
/// the same handle explicitly.
pub trait CountryCache: Send + Sync {
    /// Get the live entry for an IP.
    ///
    /// Expired entries are removed and reported as absent.
    fn get(&self, ip: &IpAddr) -> Option<CacheEntry>;

    /// Store a country for an IP for `ttl`.
    fn put(&self, ip: IpAddr, country_code: Option<String>, ttl: Duration);

    /// Number of stored entries, expired ones included until they are read.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    fn clear(&self);
}
