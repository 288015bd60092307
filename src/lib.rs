//! geo-gate Library
//!
//! Country-based access control for HTTP services: resolves the country of a
//! request (CDN headers, local ranges, cache, remote providers) and applies an
//! allow-list policy to it.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;

// Re-export commonly used types
pub use application::{
    CountryResolver, GeoGuard, Messages, ProviderRegistry, ResolverSettings, ResponseSettings,
};
pub use config::{load_config, Config, ConfigError};
pub use domain::entities::{
    AccessDecision, AccessPolicy, LocationRecord, ProviderConfig, RequestInfo, Resolution,
    ResolutionSource, Target,
};
pub use domain::errors::{CountryNotAllowed, ProviderError, ResolveError};
pub use domain::ports::{CountryCache, GeoProvider};
pub use domain::value_objects::{CountryCode, DecisionReason, LocationSource};
