//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of country-based access control.
//! They have no framework dependencies and contain only business logic.

use crate::domain::value_objects::{CountryCode, DecisionReason, LocationSource};
use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;

/// Location resolved for a single IP address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRecord {
    pub ip: IpAddr,
    pub country_code: Option<CountryCode>,
    pub country_name: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub is_local: bool,
    pub source: LocationSource,
}

impl LocationRecord {
    /// Record for an address that never leaves the local network.
    pub fn local(ip: IpAddr) -> Self {
        Self {
            ip,
            country_code: None,
            country_name: Some("Local Network".to_string()),
            city: None,
            region: None,
            is_local: true,
            source: LocationSource::Local,
        }
    }

    /// Record carrying only the country taken from a CDN header.
    pub fn from_cdn(ip: IpAddr, country_code: CountryCode) -> Self {
        Self {
            ip,
            country_code: Some(country_code),
            country_name: None,
            city: None,
            region: None,
            is_local: false,
            source: LocationSource::CdnHeader,
        }
    }
}

/// Longest lifetime a cache entry can have. Larger TTLs are clamped to it.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Cached country for one IP.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub country_code: Option<String>,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(country_code: Option<String>, ttl: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl.min(MAX_CACHE_TTL))
            .unwrap_or(now);
        Self {
            country_code,
            expires_at,
        }
    }

    /// An entry is visible strictly before its expiry instant.
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Optional credentials for the providers that take them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub ipinfo_token: Option<String>,
    pub ipdata_api_key: Option<String>,
    pub ip_api_ir_guid: Option<String>,
}

/// Provider chain and per-attempt limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Provider tried first, whatever its position in `fallbacks`
    pub primary: String,
    /// Providers tried after the primary exhausted its attempts
    pub fallbacks: Vec<String>,
    pub credentials: ProviderCredentials,
    /// Total time allowed for one request
    pub timeout: Duration,
    /// Time allowed to establish the connection
    pub connect_timeout: Duration,
    /// Attempts per provider
    pub retry_count: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            primary: "ip-api".to_string(),
            fallbacks: vec!["ip-api".to_string(), "ipinfo".to_string()],
            credentials: ProviderCredentials::default(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
            retry_count: 2,
        }
    }
}

/// Allow-list policy applied to a resolved country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    allowed_countries: Vec<String>,
    pub allow_local: bool,
    pub local_country: String,
    pub fallback_allow: bool,
}

impl AccessPolicy {
    pub fn new<I, S>(allowed_countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self {
            allowed_countries: Vec::new(),
            allow_local: true,
            local_country: crate::domain::value_objects::DEFAULT_LOCAL_COUNTRY.to_string(),
            fallback_allow: true,
        };
        policy.set_allowed_countries(allowed_countries);
        policy
    }

    pub fn allow_local(mut self, allow: bool) -> Self {
        self.allow_local = allow;
        self
    }

    pub fn local_country(mut self, sentinel: impl Into<String>) -> Self {
        self.local_country = sentinel.into();
        self
    }

    pub fn fallback_allow(mut self, allow: bool) -> Self {
        self.fallback_allow = allow;
        self
    }

    /// Allowed countries, uppercase, in configuration order.
    pub fn allowed_countries(&self) -> &[String] {
        &self.allowed_countries
    }

    /// Replace the allow-list. Codes are trimmed, uppercased and de-duplicated.
    pub fn set_allowed_countries<I, S>(&mut self, countries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_countries.clear();
        for country in countries {
            self.add_allowed_country(country.as_ref());
        }
    }

    pub fn add_allowed_country(&mut self, country: &str) {
        let country = country.trim().to_uppercase();
        if !country.is_empty() && !self.allowed_countries.contains(&country) {
            self.allowed_countries.push(country);
        }
    }

    pub fn remove_allowed_country(&mut self, country: &str) {
        let country = country.trim().to_uppercase();
        self.allowed_countries.retain(|c| *c != country);
    }

    pub fn is_country_allowed(&self, country: &str) -> bool {
        let country = country.trim().to_uppercase();
        self.allowed_countries.contains(&country)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(["IR"])
    }
}

/// Stage of the resolver that produced a country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    Cdn,
    Cache,
    Local,
    Provider(String),
    /// Every provider failed and the resolver was told to degrade to "unknown"
    Exhausted,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cdn => f.write_str("cdn"),
            Self::Cache => f.write_str("cache"),
            Self::Local => f.write_str("local"),
            Self::Provider(name) => write!(f, "provider:{}", name),
            Self::Exhausted => f.write_str("exhausted"),
        }
    }
}

impl Serialize for ResolutionSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Country resolved for a target. `country` is `None` only after exhaustion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub country: Option<String>,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn new(country: impl Into<String>, source: ResolutionSource) -> Self {
        Self {
            country: Some(country.into()),
            source,
        }
    }

    pub fn exhausted() -> Self {
        Self {
            country: None,
            source: ResolutionSource::Exhausted,
        }
    }
}

/// Outcome of evaluating the policy for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub resolved_country: Option<String>,
    pub reason: DecisionReason,
}

/// Request data the resolver needs: trust headers and the socket peer.
///
/// Header names are stored lowercase so lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    headers: HashMap<String, String>,
    pub peer_addr: Option<IpAddr>,
}

impl RequestInfo {
    pub fn new(peer_addr: Option<IpAddr>) -> Self {
        Self {
            headers: HashMap::new(),
            peer_addr,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn insert_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// What to resolve: the origin of the current request, or an explicit address.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Request(&'a RequestInfo),
    Ip(IpAddr),
}

impl From<IpAddr> for Target<'_> {
    fn from(ip: IpAddr) -> Self {
        Self::Ip(ip)
    }
}

impl<'a> From<&'a RequestInfo> for Target<'a> {
    fn from(request: &'a RequestInfo) -> Self {
        Self::Request(request)
    }
}
