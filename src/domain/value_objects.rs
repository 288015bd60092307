//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Serialize, Serializer};

/// Marker returned when a provider answered but had no country for the IP.
pub const UNKNOWN_COUNTRY: &str = "UNKNOWN";

/// Sentinel returned for loopback/private/reserved addresses unless configured otherwise.
pub const DEFAULT_LOCAL_COUNTRY: &str = "LOCAL";

/// Cloudflare's "could not determine" and "Tor exit" pseudo-codes.
const CDN_SENTINELS: [&str; 2] = ["XX", "T1"];

/// ISO 3166-1 alpha-2 country code.
///
/// Always two uppercase ASCII letters and never one of the CDN sentinels.
/// Construction normalizes (trim + uppercase) and rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse and normalize a raw country code.
    ///
    /// # Examples
    /// ```
    /// use geo_gate::CountryCode;
    ///
    /// assert_eq!(CountryCode::parse(" de ").unwrap().as_str(), "DE");
    /// assert!(CountryCode::parse("XX").is_none());
    /// assert!(CountryCode::parse("USA").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        let well_formed = code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase());
        if !well_formed || CDN_SENTINELS.contains(&code.as_str()) {
            return None;
        }
        Some(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for CountryCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Where a location record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationSource {
    /// Country injected by a CDN or reverse proxy header
    CdnHeader,
    /// Loopback, private or reserved address
    Local,
    /// Remote lookup through the named provider
    Provider(String),
}

impl std::fmt::Display for LocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CdnHeader => f.write_str("cdn-header"),
            Self::Local => f.write_str("local"),
            Self::Provider(name) => write!(f, "provider:{}", name),
        }
    }
}

impl Serialize for LocationSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How the country behind an access decision was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionReason {
    Cdn,
    Cache,
    Local,
    ProviderSuccess,
    ProviderExhaustedFallbackAllow,
    ProviderExhaustedFallbackDeny,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cdn => "cdn",
            Self::Cache => "cache",
            Self::Local => "local",
            Self::ProviderSuccess => "provider-success",
            Self::ProviderExhaustedFallbackAllow => "provider-exhausted-fallback-allow",
            Self::ProviderExhaustedFallbackDeny => "provider-exhausted-fallback-deny",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
